//! In-memory transport and fixtures for controller tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use linkup_shared::protocol::{
    ChatRoom, Message, MessagePage, MessageSender, OutgoingMessage, UserSummary,
};
use linkup_shared::{MessageId, RoomId, UserId};

use crate::error::{ClientError, Result};
use crate::transport::ChatTransport;

/// The user the fake server answers sends for.
pub const CURRENT_USER: UserId = UserId(1);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetRoom(RoomId),
    List(RoomId, Option<u32>),
    Send(RoomId, OutgoingMessage),
    MarkRead(RoomId),
}

pub fn msg(id: u64, sender: u64) -> Message {
    Message {
        id: MessageId(id),
        sender: MessageSender { id: UserId(sender) },
        content: format!("message {id}"),
        file_data: None,
        file_type: None,
        file_name: None,
        is_read: false,
        created_at: Utc
            .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .single()
            .unwrap_or_default(),
    }
}

/// A newest-first page of messages from user 2.
pub fn page(ids: &[u64], has_more: bool) -> MessagePage {
    MessagePage {
        count: None,
        next: has_more.then(|| "next".to_string()),
        previous: None,
        results: ids.iter().map(|&id| msg(id, 2)).collect(),
    }
}

#[derive(Default)]
pub struct FakeTransport {
    rooms: Mutex<HashMap<RoomId, ChatRoom>>,
    room_error: Mutex<Option<ClientError>>,
    latest: Mutex<MessagePage>,
    pages: Mutex<HashMap<u32, MessagePage>>,
    list_errors: Mutex<VecDeque<ClientError>>,
    send_error: Mutex<Option<ClientError>>,
    latency: Mutex<Option<Duration>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
}

impl FakeTransport {
    pub fn room(id: u64) -> ChatRoom {
        ChatRoom {
            id: RoomId(id),
            other_user: UserSummary {
                id: UserId(2),
                full_name: "Ada Lovelace".into(),
                first_name: Some("Ada".into()),
                email: "ada@example.com".into(),
                profile_photo: None,
            },
            updated_at: None,
            last_message: None,
            unread_count: 0,
        }
    }

    pub fn with_room(id: u64) -> Self {
        let fake = Self {
            next_id: AtomicU64::new(1000),
            ..Self::default()
        };
        fake.add_room(Self::room(id));
        fake
    }

    pub fn add_room(&self, room: ChatRoom) {
        self.rooms.lock().unwrap().insert(room.id, room);
    }

    pub fn set_latest(&self, page: MessagePage) {
        *self.latest.lock().unwrap() = page;
    }

    pub fn set_page(&self, number: u32, page: MessagePage) {
        self.pages.lock().unwrap().insert(number, page);
    }

    pub fn fail_room(&self, err: ClientError) {
        *self.room_error.lock().unwrap() = Some(err);
    }

    pub fn fail_next_list(&self, err: ClientError) {
        self.list_errors.lock().unwrap().push_back(err);
    }

    pub fn fail_next_send(&self, err: ClientError) {
        *self.send_error.lock().unwrap() = Some(err);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Calls already waiting keep their delay.
    pub fn clear_latency(&self) {
        *self.latency.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn room_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::GetRoom(_)))
    }

    pub fn list_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::List(..)))
    }

    pub fn mark_read_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::MarkRead(_)))
    }

    /// Explicit page numbers requested, in order.
    pub fn page_requests(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::List(_, page) => page,
                _ => None,
            })
            .collect()
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(_, body) => Some(body),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn get_room(&self, room_id: RoomId) -> Result<ChatRoom> {
        self.record(Call::GetRoom(room_id));
        self.delay().await;
        if let Some(err) = self.room_error.lock().unwrap().take() {
            return Err(err);
        }
        self.rooms
            .lock()
            .unwrap()
            .get(&room_id)
            .cloned()
            .ok_or(ClientError::NotFound)
    }

    async fn list_messages(&self, room_id: RoomId, page: Option<u32>) -> Result<MessagePage> {
        self.record(Call::List(room_id, page));
        self.delay().await;
        if let Some(err) = self.list_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(match page {
            None | Some(1) => self.latest.lock().unwrap().clone(),
            Some(n) => self.pages.lock().unwrap().get(&n).cloned().unwrap_or_default(),
        })
    }

    async fn send_message(&self, room_id: RoomId, message: &OutgoingMessage) -> Result<Message> {
        self.record(Call::Send(room_id, message.clone()));
        self.delay().await;
        if let Some(err) = self.send_error.lock().unwrap().take() {
            return Err(err);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(Message {
            content: message.content.clone(),
            file_data: message.file_data.clone(),
            file_type: message.file_type.clone(),
            file_name: message.file_name.clone(),
            ..msg(id, CURRENT_USER.0)
        })
    }

    async fn mark_read(&self, room_id: RoomId) -> Result<()> {
        self.record(Call::MarkRead(room_id));
        Ok(())
    }
}
