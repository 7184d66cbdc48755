//! The message transport seam used by the chat controller.
//!
//! Each operation is a single request/response round trip; retrying is
//! left to the caller (the controller's poll loop retries on its own).

use async_trait::async_trait;
use linkup_shared::protocol::{ChatRoom, Message, MessagePage, OutgoingMessage, Paginated};
use linkup_shared::RoomId;
use serde::Serialize;
use tracing::debug;

use crate::api::HttpApi;
use crate::error::{ClientError, Result};

#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Room metadata; `Forbidden` / `NotFound` when the caller is not a participant.
    async fn get_room(&self, room_id: RoomId) -> Result<ChatRoom>;

    /// A page of messages, newest first. `None` is the most recent page.
    async fn list_messages(&self, room_id: RoomId, page: Option<u32>) -> Result<MessagePage>;

    /// Create a message and return the stored record.
    async fn send_message(&self, room_id: RoomId, message: &OutgoingMessage) -> Result<Message>;

    /// Mark every message of the room as read for the current user.
    async fn mark_read(&self, room_id: RoomId) -> Result<()>;
}

#[derive(Serialize)]
struct PageQuery {
    page: u32,
}

#[async_trait]
impl ChatTransport for HttpApi {
    async fn get_room(&self, room_id: RoomId) -> Result<ChatRoom> {
        self.get_json(&format!("/chat/rooms/{room_id}/")).await
    }

    async fn list_messages(&self, room_id: RoomId, page: Option<u32>) -> Result<MessagePage> {
        let path = format!("/chat/rooms/{room_id}/messages/");
        match page {
            Some(page) => self.get_query(&path, &PageQuery { page }).await,
            None => self.get_json(&path).await,
        }
    }

    async fn send_message(&self, room_id: RoomId, message: &OutgoingMessage) -> Result<Message> {
        if message.is_empty() {
            return Err(ClientError::Validation(
                "Message must have content or a file".into(),
            ));
        }
        debug!(
            room = %room_id,
            has_file = message.file_data.is_some(),
            "Sending message"
        );
        self.post_json(&format!("/chat/rooms/{room_id}/messages/"), message)
            .await
    }

    async fn mark_read(&self, room_id: RoomId) -> Result<()> {
        self.post_unit(&format!("/chat/rooms/{room_id}/mark_read/"), &serde_json::json!({}))
            .await
    }
}

impl HttpApi {
    /// Rooms of the current user, most recently updated first.
    pub async fn list_rooms(&self, page: Option<u32>) -> Result<Paginated<ChatRoom>> {
        match page {
            Some(page) => self.get_query("/chat/rooms/", &PageQuery { page }).await,
            None => self.get_json("/chat/rooms/").await,
        }
    }
}
