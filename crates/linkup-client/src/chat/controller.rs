//! The chat room controller.
//!
//! Owns the state of one mounted room: the displayed messages, the
//! pagination cursor, the compose form and the poll task. Every response is
//! tagged with the mount epoch it was issued under and is dropped if the
//! room changed in the meantime. Fetches of the same kind never overlap
//! within a mount; each has an atomic single-flight guard that records the
//! epoch of the operation holding it.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use linkup_shared::protocol::Message;
use linkup_shared::{Attachment, RoomId};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::chat::compose;
use crate::chat::state::{self, AttachmentInfo, Phase, RoomSnapshot, RoomState};
use crate::error::{ClientError, Result};
use crate::events::{self, emit_event, EventReceiver, EventSender, Notification, RedirectTarget, RoomEvent};
use crate::transport::ChatTransport;

const LOAD_FAILED: &str = "Failed to load messages";
const LOAD_OLDER_FAILED: &str = "Failed to load older messages";
const SEND_FAILED: &str = "Failed to send message";
const NO_ROOM: &str = "Open a chat room first";

/// Epoch-scoped single-flight token.
///
/// The flag holds the epoch of the operation in flight, 0 when idle. A
/// holder from an older epoch does not block the current one. Released on
/// drop, so an early return or a cancelled future cannot leave the
/// operation locked.
struct FlightGuard<'a> {
    flag: &'a AtomicU64,
    epoch: u64,
}

impl<'a> FlightGuard<'a> {
    fn try_acquire(flag: &'a AtomicU64, epoch: u64) -> Option<Self> {
        let mut held = flag.load(Ordering::Acquire);
        loop {
            if held == epoch {
                return None;
            }
            match flag.compare_exchange(held, epoch, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return Some(Self { flag, epoch }),
                Err(actual) => held = actual,
            }
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // A newer epoch may have taken the flag over; leave it alone then.
        let _ = self
            .flag
            .compare_exchange(self.epoch, 0, Ordering::AcqRel, Ordering::Acquire);
    }
}

fn held_by(flag: &AtomicU64, epoch: u64) -> bool {
    epoch != 0 && flag.load(Ordering::Acquire) == epoch
}

/// State shared between the controller and its poll task.
struct Shared<T> {
    transport: Arc<T>,
    state: Mutex<RoomState>,
    events: EventSender,
    polling: AtomicU64,
    loading_older: AtomicU64,
    sending: AtomicU64,
}

impl<T: ChatTransport> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: RoomEvent) {
        emit_event(&self.events, event);
    }

    fn is_live(&self, epoch: u64) -> bool {
        let st = self.lock();
        st.is_current(epoch) && st.phase.is_live()
    }

    async fn mark_read(&self, room_id: RoomId) {
        if let Err(e) = self.transport.mark_read(room_id).await {
            warn!(room = %room_id, error = %e, "Failed to mark messages as read");
        }
    }

    /// One poll tick: replace the display with the latest page if it grew.
    async fn poll(&self, epoch: u64) -> bool {
        let Some(_guard) = FlightGuard::try_acquire(&self.polling, epoch) else {
            debug!("Poll already in flight");
            return false;
        };
        if held_by(&self.sending, epoch) {
            debug!("Skipping poll while sending");
            return false;
        }

        let room_id = {
            let st = self.lock();
            match st.room_id {
                Some(id) if st.is_current(epoch) && st.phase.is_live() => id,
                _ => return false,
            }
        };

        let page = match self.transport.list_messages(room_id, None).await {
            Ok(page) => page,
            Err(e) => {
                warn!(room = %room_id, error = %e, "Poll failed");
                return false;
            }
        };

        let count = {
            let mut st = self.lock();
            if !st.is_current(epoch) {
                debug!(room = %room_id, "Discarding stale poll response");
                return false;
            }
            // Count heuristic: only a strictly larger page counts as news.
            if page.results.len() <= st.messages.len() {
                debug!(room = %room_id, count = page.results.len(), "No new messages");
                return false;
            }
            st.has_more = page.has_more();
            st.page = 1;
            st.messages = state::ascending(page.results);
            st.messages.len()
        };

        debug!(room = %room_id, count, "New messages");
        self.emit(RoomEvent::MessagesUpdated { room_id, count });
        self.mark_read(room_id).await;
        true
    }
}

/// Controller for one chat room view.
///
/// Created together with the receiving end of its event channel. All
/// operations take `&self`, so the controller can be shared (e.g. in an
/// `Arc`) between an input handler and a renderer.
pub struct ChatRoomController<T: ChatTransport> {
    shared: Arc<Shared<T>>,
    poll_interval: Duration,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl<T: ChatTransport> ChatRoomController<T> {
    pub fn new(transport: Arc<T>, poll_interval: Duration) -> (Self, EventReceiver) {
        let (tx, rx) = events::channel();
        let shared = Arc::new(Shared {
            transport,
            state: Mutex::new(RoomState::new()),
            events: tx,
            polling: AtomicU64::new(0),
            loading_older: AtomicU64::new(0),
            sending: AtomicU64::new(0),
        });
        let controller = Self {
            shared,
            poll_interval,
            poller: Mutex::new(None),
        };
        (controller, rx)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Show the room identified by `raw_room_id`.
    ///
    /// Any previously mounted room is torn down first. Returns the phase
    /// the controller settled in.
    pub async fn mount(&self, raw_room_id: &str) -> Phase {
        self.stop_poller().await;

        let room_id = match RoomId::parse(raw_room_id) {
            Ok(id) => id,
            Err(e) => {
                self.shared.lock().reset(None, Phase::Redirecting);
                info!(error = %e, "Invalid room id, redirecting");
                self.shared.emit(RoomEvent::Redirect(RedirectTarget::Rooms));
                return Phase::Redirecting;
            }
        };

        let epoch = {
            let mut st = self.shared.lock();
            let epoch = st.reset(Some(room_id), Phase::Initializing);
            st.loading = true;
            epoch
        };
        info!(room = %room_id, "Mounting chat room");

        let transport = &self.shared.transport;
        let (room, page) = tokio::join!(
            transport.get_room(room_id),
            transport.list_messages(room_id, None)
        );

        let (room, page) = match room.and_then(|room| page.map(|page| (room, page))) {
            Ok(loaded) => loaded,
            Err(e) => return self.fail_initial(epoch, room_id, e),
        };

        let count = {
            let mut st = self.shared.lock();
            if !st.is_current(epoch) {
                debug!(room = %room_id, "Discarding stale initial load");
                return st.phase;
            }
            st.room = Some(room);
            st.has_more = page.has_more();
            st.messages = state::ascending(page.results);
            st.page = 1;
            st.loading = false;
            st.error = None;
            st.phase = Phase::Ready;
            st.messages.len()
        };

        info!(room = %room_id, count, "Chat room ready");
        self.shared.emit(RoomEvent::MessagesUpdated { room_id, count });
        self.shared.mark_read(room_id).await;
        self.start_poller(epoch);
        Phase::Ready
    }

    /// Stop polling and forget the room. In-flight responses are discarded.
    pub async fn unmount(&self) {
        self.stop_poller().await;
        let room_id = {
            let mut st = self.shared.lock();
            let room_id = st.room_id;
            st.reset(None, Phase::Idle);
            room_id
        };
        if let Some(room_id) = room_id {
            info!(room = %room_id, "Chat room unmounted");
        }
    }

    fn fail_initial(&self, epoch: u64, room_id: RoomId, err: ClientError) -> Phase {
        let mut st = self.shared.lock();
        if !st.is_current(epoch) {
            return st.phase;
        }
        st.loading = false;

        match err.redirect_target() {
            Some(target) => {
                st.phase = Phase::Redirecting;
                drop(st);
                error!(room = %room_id, error = %err, "Cannot open chat room, redirecting");
                self.shared.emit(RoomEvent::Redirect(target));
                Phase::Redirecting
            }
            None => {
                st.phase = Phase::Error;
                st.error = Some(LOAD_FAILED.to_string());
                drop(st);
                error!(room = %room_id, error = %err, "Failed to load chat room");
                Phase::Error
            }
        }
    }

    fn redirect(&self, epoch: u64, target: RedirectTarget) {
        {
            let mut st = self.shared.lock();
            if !st.is_current(epoch) {
                return;
            }
            st.phase = Phase::Redirecting;
        }
        if let Some(handle) = self.take_poller() {
            handle.abort();
        }
        self.shared.emit(RoomEvent::Redirect(target));
    }

    // -----------------------------------------------------------------------
    // Polling
    // -----------------------------------------------------------------------

    fn start_poller(&self, epoch: u64) {
        let shared = Arc::clone(&self.shared);
        let period = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !shared.is_live(epoch) {
                    debug!(epoch, "Poller stopping, room no longer live");
                    break;
                }
                shared.poll(epoch).await;
            }
        });

        if let Some(previous) = self.poller_slot().replace(handle) {
            previous.abort();
        }
        debug!(epoch, period_ms = period.as_millis() as u64, "Poller started");
    }

    fn poller_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poller.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take_poller(&self) -> Option<JoinHandle<()>> {
        self.poller_slot().take()
    }

    async fn stop_poller(&self) {
        if let Some(handle) = self.take_poller() {
            handle.abort();
            // Wait for the task to be gone so no tick fires after this returns.
            let _ = handle.await;
            debug!("Poller stopped");
        }
    }

    /// Whether a poll task is currently scheduled.
    pub fn is_polling(&self) -> bool {
        self.poller_slot()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Run one poll tick now. Returns whether the display changed.
    pub async fn poll_once(&self) -> bool {
        let epoch = self.shared.lock().epoch;
        self.shared.poll(epoch).await
    }

    // -----------------------------------------------------------------------
    // Pagination
    // -----------------------------------------------------------------------

    /// Fetch the next older page and put it on top of the display.
    ///
    /// No-op when there is nothing older, the room is not ready, or another
    /// older-page fetch is in flight. Returns whether messages were added.
    pub async fn load_older(&self) -> bool {
        let (room_id, epoch, next_page) = {
            let st = self.shared.lock();
            match st.room_id {
                Some(id) if st.phase == Phase::Ready && st.has_more => (id, st.epoch, st.page + 1),
                _ => return false,
            }
        };
        let Some(_guard) = FlightGuard::try_acquire(&self.shared.loading_older, epoch) else {
            debug!("Older page already loading");
            return false;
        };
        debug!(room = %room_id, page = next_page, "Loading older messages");

        match self.shared.transport.list_messages(room_id, Some(next_page)).await {
            Ok(page) => {
                let (added, count) = {
                    let mut st = self.shared.lock();
                    if !st.is_current(epoch) {
                        debug!(room = %room_id, "Discarding stale older page");
                        return false;
                    }
                    st.has_more = page.has_more();
                    let added = state::prepend_older(&mut st.messages, page.results);
                    st.page = next_page;
                    (added, st.messages.len())
                };
                debug!(room = %room_id, added, count, "Older messages loaded");
                self.shared.emit(RoomEvent::MessagesUpdated { room_id, count });
                self.shared.mark_read(room_id).await;
                added > 0
            }
            Err(e) => {
                match e.redirect_target() {
                    Some(target) => {
                        error!(room = %room_id, error = %e, "Lost access to chat room");
                        self.redirect(epoch, target);
                    }
                    None => {
                        warn!(room = %room_id, error = %e, "Failed to load older messages");
                        if self.shared.lock().is_current(epoch) {
                            self.shared
                                .emit(RoomEvent::Notify(Notification::error(LOAD_OLDER_FAILED)));
                        }
                    }
                }
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Compose
    // -----------------------------------------------------------------------

    pub fn set_draft(&self, text: impl Into<String>) {
        self.shared.lock().draft = text.into();
    }

    /// Select the file for the next message, replacing any previous one.
    ///
    /// Requires a loaded room, since mounting clears the compose form.
    /// Oversized or non-media files are rejected with a warning before any
    /// network call; the previous selection is kept.
    pub fn select_attachment(&self, attachment: Attachment) -> Result<()> {
        if !self.shared.lock().phase.is_live() {
            return Err(self.reject_attachment(ClientError::Validation(NO_ROOM.into())));
        }
        if let Err(e) = attachment.validate() {
            return Err(self.reject_attachment(e.into()));
        }
        debug!(file = %attachment.file_name, size = attachment.size(), "Attachment selected");
        self.shared.lock().attachment = Some(attachment);
        Ok(())
    }

    /// Read a file from disk and select it.
    pub async fn select_attachment_path(&self, path: impl AsRef<Path>) -> Result<()> {
        match Attachment::from_path(path.as_ref()).await {
            Ok(attachment) => self.select_attachment(attachment),
            Err(e) => Err(self.reject_attachment(e.into())),
        }
    }

    fn reject_attachment(&self, err: ClientError) -> ClientError {
        let text = match &err {
            ClientError::AttachmentTooLarge { .. } => "File size should be less than 5MB".to_string(),
            ClientError::Io(e) => format!("Could not read file: {e}"),
            other => other.user_message(),
        };
        warn!(error = %err, "Attachment rejected");
        self.shared.emit(RoomEvent::Notify(Notification::warning(text)));
        err
    }

    pub fn clear_attachment(&self) {
        self.shared.lock().attachment = None;
    }

    /// Send the draft and pending attachment.
    ///
    /// Returns `Ok(None)` without any network call when there is nothing to
    /// send, the room is not ready, or a send is already in flight. On
    /// failure the compose state is kept so the user can retry.
    pub async fn send(&self) -> Result<Option<Message>> {
        let (room_id, epoch, draft, attachment) = {
            let st = self.shared.lock();
            let room_id = match st.room_id {
                Some(id) if st.phase.is_live() => id,
                _ => return Ok(None),
            };
            if !compose::is_sendable(&st.draft, st.attachment.as_ref()) {
                return Ok(None);
            }
            (room_id, st.epoch, st.draft.clone(), st.attachment.clone())
        };
        let Some(_guard) = FlightGuard::try_acquire(&self.shared.sending, epoch) else {
            debug!("Send already in flight");
            return Ok(None);
        };

        let result = match compose::encode(&draft, attachment).await {
            Ok(outgoing) => self.shared.transport.send_message(room_id, &outgoing).await,
            Err(e) => Err(e),
        };

        let message = match result {
            Ok(message) => message,
            Err(e) => {
                error!(room = %room_id, error = %e, "Failed to send message");
                self.shared
                    .emit(RoomEvent::Notify(Notification::error(send_failure_text(&e))));
                return Err(e);
            }
        };

        let count = {
            let mut st = self.shared.lock();
            if st.is_current(epoch) {
                state::append(&mut st.messages, message.clone());
                st.draft.clear();
                st.attachment = None;
                Some(st.messages.len())
            } else {
                None
            }
        };

        info!(room = %room_id, message = %message.id, "Message sent");
        if let Some(count) = count {
            self.shared.emit(RoomEvent::MessagesUpdated { room_id, count });
        }
        self.shared.emit(RoomEvent::MessageSent {
            room_id,
            message: message.clone(),
        });
        Ok(Some(message))
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.snapshot().phase
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let st = self.shared.lock();
        // Operations still running for a previous room do not count.
        let sending = held_by(&self.shared.sending, st.epoch);
        let loading_older = held_by(&self.shared.loading_older, st.epoch);

        let phase = match st.phase {
            Phase::Ready if sending => Phase::Sending,
            Phase::Ready if loading_older => Phase::LoadingOlder,
            other => other,
        };

        RoomSnapshot {
            phase,
            room_id: st.room_id,
            room: st.room.clone(),
            messages: st.messages.clone(),
            page: st.page,
            has_more: st.has_more,
            loading: st.loading || loading_older,
            sending,
            error: st.error.clone(),
            draft: st.draft.clone(),
            attachment: st.attachment.as_ref().map(AttachmentInfo::from),
        }
    }
}

impl<T: ChatTransport> Drop for ChatRoomController<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

fn send_failure_text(err: &ClientError) -> String {
    match err {
        ClientError::Validation(detail) if !detail.is_empty() => detail.clone(),
        ClientError::Server { detail, .. } if !detail.is_empty() => detail.clone(),
        _ => SEND_FAILED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{msg, page, FakeTransport, CURRENT_USER};
    use linkup_shared::constants::MAX_ATTACHMENT_SIZE;
    use linkup_shared::MessageId;

    const POLL: Duration = Duration::from_secs(5);

    fn ids(messages: &[Message]) -> Vec<u64> {
        messages.iter().map(|m| m.id.0).collect()
    }

    fn drain(rx: &mut EventReceiver) -> Vec<RoomEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn controller(fake: &Arc<FakeTransport>) -> (ChatRoomController<FakeTransport>, EventReceiver) {
        ChatRoomController::new(Arc::clone(fake), POLL)
    }

    /// Room 7 whose latest page is `[5, 4, 3]` with an older page `[2, 1]`.
    fn seeded() -> Arc<FakeTransport> {
        let fake = FakeTransport::with_room(7);
        fake.set_latest(page(&[5, 4, 3], true));
        fake.set_page(2, page(&[2, 1], false));
        Arc::new(fake)
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_fetches_once_and_starts_one_poller() {
        let fake = seeded();
        let (ctrl, _rx) = controller(&fake);

        assert_eq!(ctrl.mount("7").await, Phase::Ready);
        assert_eq!(fake.room_calls(), 1);
        assert_eq!(fake.list_calls(), 1);
        assert!(ctrl.is_polling());

        tokio::time::sleep(POLL + Duration::from_millis(100)).await;
        assert_eq!(fake.list_calls(), 2);

        ctrl.unmount().await;
        assert!(!ctrl.is_polling());
        assert_eq!(ctrl.phase(), Phase::Idle);

        tokio::time::sleep(POLL * 5).await;
        assert_eq!(fake.list_calls(), 2);
        assert_eq!(fake.room_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_room_id_redirects_without_fetching() {
        for raw in ["", "abc", "0", "-1"] {
            let fake = seeded();
            let (ctrl, mut rx) = controller(&fake);

            assert_eq!(ctrl.mount(raw).await, Phase::Redirecting);
            assert_eq!(fake.total_calls(), 0);
            assert!(!ctrl.is_polling());
            assert_eq!(
                drain(&mut rx),
                vec![RoomEvent::Redirect(RedirectTarget::Rooms)]
            );
        }
    }

    #[tokio::test]
    async fn test_first_page_displayed_ascending() {
        let fake = seeded();
        let (ctrl, mut rx) = controller(&fake);
        ctrl.mount("7").await;

        let snap = ctrl.snapshot();
        assert_eq!(ids(&snap.messages), vec![3, 4, 5]);
        assert_eq!(snap.page, 1);
        assert!(snap.has_more);
        assert!(!snap.loading);
        assert_eq!(snap.room.map(|r| r.id), Some(RoomId(7)));
        assert_eq!(fake.mark_read_calls(), 1);
        assert_eq!(
            drain(&mut rx),
            vec![RoomEvent::MessagesUpdated { room_id: RoomId(7), count: 3 }]
        );
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_forbidden_room_redirects() {
        let fake = Arc::new(FakeTransport::with_room(7));
        fake.fail_room(ClientError::Forbidden);
        let (ctrl, mut rx) = controller(&fake);

        assert_eq!(ctrl.mount("7").await, Phase::Redirecting);
        assert!(!ctrl.is_polling());
        assert_eq!(drain(&mut rx), vec![RoomEvent::Redirect(RedirectTarget::Rooms)]);
    }

    #[tokio::test]
    async fn test_unauthorized_redirects_to_login() {
        let fake = Arc::new(FakeTransport::with_room(7));
        fake.fail_next_list(ClientError::Unauthorized);
        let (ctrl, mut rx) = controller(&fake);

        assert_eq!(ctrl.mount("7").await, Phase::Redirecting);
        assert_eq!(drain(&mut rx), vec![RoomEvent::Redirect(RedirectTarget::Login)]);
    }

    #[tokio::test]
    async fn test_server_error_enters_error_phase() {
        let fake = Arc::new(FakeTransport::with_room(7));
        fake.fail_next_list(ClientError::Server { status: 500, detail: "boom".into() });
        let (ctrl, mut rx) = controller(&fake);

        assert_eq!(ctrl.mount("7").await, Phase::Error);
        let snap = ctrl.snapshot();
        assert_eq!(snap.error.as_deref(), Some("Failed to load messages"));
        assert!(!ctrl.is_polling());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_older_prepends_and_is_single_flight() {
        let fake = seeded();
        let (ctrl, _rx) = controller(&fake);
        ctrl.mount("7").await;
        fake.set_latency(Duration::from_millis(50));

        let (first, second) = tokio::join!(ctrl.load_older(), ctrl.load_older());
        assert!(first);
        assert!(!second);
        assert_eq!(fake.page_requests(), vec![2]);

        let snap = ctrl.snapshot();
        assert_eq!(ids(&snap.messages), vec![1, 2, 3, 4, 5]);
        assert_eq!(snap.page, 2);
        assert!(!snap.has_more);

        // Nothing older left.
        assert!(!ctrl.load_older().await);
        assert_eq!(fake.page_requests(), vec![2]);
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_load_older_failure_keeps_messages() {
        let fake = seeded();
        let (ctrl, mut rx) = controller(&fake);
        ctrl.mount("7").await;
        drain(&mut rx);

        fake.fail_next_list(ClientError::Server { status: 503, detail: String::new() });
        assert!(!ctrl.load_older().await);

        let snap = ctrl.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert_eq!(ids(&snap.messages), vec![3, 4, 5]);
        assert_eq!(snap.page, 1);
        assert_eq!(
            drain(&mut rx),
            vec![RoomEvent::Notify(Notification::error("Failed to load older messages"))]
        );
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_load_older_forbidden_redirects() {
        let fake = seeded();
        let (ctrl, mut rx) = controller(&fake);
        ctrl.mount("7").await;
        drain(&mut rx);

        fake.fail_next_list(ClientError::Forbidden);
        assert!(!ctrl.load_older().await);
        assert_eq!(ctrl.phase(), Phase::Redirecting);
        assert!(!ctrl.is_polling());
        assert_eq!(drain(&mut rx), vec![RoomEvent::Redirect(RedirectTarget::Rooms)]);
    }

    #[tokio::test]
    async fn test_send_text_appends_and_clears_draft() {
        let fake = seeded();
        let (ctrl, mut rx) = controller(&fake);
        ctrl.mount("7").await;
        drain(&mut rx);

        ctrl.set_draft("  hi ");
        let sent = ctrl.send().await.unwrap().unwrap();
        assert_eq!(sent.content, "hi");
        assert!(sent.file_data.is_none());
        assert!(sent.file_type.is_none());
        assert!(sent.file_name.is_none());

        let snap = ctrl.snapshot();
        assert_eq!(snap.messages.len(), 4);
        assert_eq!(snap.messages.last(), Some(&sent));
        assert!(snap.draft.is_empty());
        assert!(!snap.sending);

        let outgoing = fake.sent();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(serde_json::to_value(&outgoing[0]).unwrap(), serde_json::json!({ "content": "hi" }));

        assert_eq!(
            drain(&mut rx),
            vec![
                RoomEvent::MessagesUpdated { room_id: RoomId(7), count: 4 },
                RoomEvent::MessageSent { room_id: RoomId(7), message: sent },
            ]
        );
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_empty_send_is_noop() {
        let fake = seeded();
        let (ctrl, _rx) = controller(&fake);
        ctrl.mount("7").await;

        ctrl.set_draft("   ");
        assert!(ctrl.send().await.unwrap().is_none());
        assert!(fake.sent().is_empty());
        assert_eq!(ctrl.snapshot().messages.len(), 3);
        ctrl.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_send_is_single_flight() {
        let fake = seeded();
        let (ctrl, _rx) = controller(&fake);
        ctrl.mount("7").await;
        fake.set_latency(Duration::from_millis(50));

        ctrl.set_draft("once");
        let (a, b) = tokio::join!(ctrl.send(), ctrl.send());
        assert!(a.unwrap().is_some());
        assert!(b.unwrap().is_none());
        assert_eq!(fake.sent().len(), 1);
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_oversized_attachment_rejected_before_network() {
        let fake = seeded();
        let (ctrl, mut rx) = controller(&fake);
        ctrl.mount("7").await;
        drain(&mut rx);
        let calls_before = fake.total_calls();

        let big = Attachment::new("huge.png", "image/png", vec![0; 6 * 1024 * 1024]);
        let err = ctrl.select_attachment(big).unwrap_err();
        assert!(matches!(err, ClientError::AttachmentTooLarge { .. }));
        assert!(ctrl.snapshot().attachment.is_none());
        assert_eq!(fake.total_calls(), calls_before);
        assert_eq!(
            drain(&mut rx),
            vec![RoomEvent::Notify(Notification::warning("File size should be less than 5MB"))]
        );
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_image_attachment_is_sent() {
        let fake = seeded();
        let (ctrl, _rx) = controller(&fake);
        ctrl.mount("7").await;

        let image = Attachment::new("cat.png", "image/png", vec![7; 1024 * 1024]);
        ctrl.select_attachment(image).unwrap();
        assert_eq!(
            ctrl.snapshot().attachment.map(|a| a.size),
            Some(1024 * 1024)
        );

        let sent = ctrl.send().await.unwrap().unwrap();
        assert!(sent.file_type.as_deref().unwrap().starts_with("image/"));
        assert_eq!(sent.content, "");

        let outgoing = &fake.sent()[0];
        assert_eq!(outgoing.file_name.as_deref(), Some("cat.png"));
        assert!(outgoing.file_data.as_ref().unwrap().len() > 1024 * 1024);

        let snap = ctrl.snapshot();
        assert!(snap.attachment.is_none());
        assert_eq!(snap.messages.last(), Some(&sent));
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_attachment_limits() {
        let fake = seeded();
        let (ctrl, _rx) = controller(&fake);
        ctrl.mount("7").await;

        let at_limit = Attachment::new("a.mp4", "video/mp4", vec![0; MAX_ATTACHMENT_SIZE]);
        assert!(ctrl.select_attachment(at_limit).is_ok());

        let pdf = Attachment::new("a.pdf", "application/pdf", vec![0; 10]);
        assert!(matches!(ctrl.select_attachment(pdf), Err(ClientError::Validation(_))));
        // Previous selection survives a rejected one.
        assert_eq!(
            ctrl.snapshot().attachment.map(|a| a.file_name),
            Some("a.mp4".to_string())
        );

        ctrl.clear_attachment();
        assert!(ctrl.snapshot().attachment.is_none());
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_attachment_requires_open_room() {
        let fake = seeded();
        let (ctrl, mut rx) = controller(&fake);

        let image = Attachment::new("cat.png", "image/png", vec![1; 16]);
        let err = ctrl.select_attachment(image).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(ctrl.snapshot().attachment.is_none());
        assert_eq!(
            drain(&mut rx),
            vec![RoomEvent::Notify(Notification::warning("Open a chat room first"))]
        );
        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remount_is_not_blocked_by_previous_room() {
        let fake = seeded();
        fake.add_room(FakeTransport::room(9));
        let (ctrl, _rx) = controller(&fake);
        ctrl.mount("7").await;

        fake.set_latency(Duration::from_secs(20));
        ctrl.set_draft("slow");
        let previous = async { tokio::join!(ctrl.send(), ctrl.load_older()) };

        let next = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            fake.clear_latency();
            assert_eq!(ctrl.mount("9").await, Phase::Ready);

            let snap = ctrl.snapshot();
            assert_eq!(snap.phase, Phase::Ready);
            assert!(!snap.sending);
            assert!(!snap.loading);

            assert!(ctrl.load_older().await);
            ctrl.set_draft("fast");
            let sent = ctrl.send().await.unwrap();
            assert_eq!(sent.map(|m| m.content), Some("fast".to_string()));
        };

        let ((slow_send, slow_older), ()) = tokio::join!(previous, next);
        assert!(slow_send.unwrap().is_some());
        assert!(!slow_older);

        let snap = ctrl.snapshot();
        assert_eq!(snap.room_id, Some(RoomId(9)));
        assert_eq!(ids(&snap.messages)[..5], [1, 2, 3, 4, 5]);
        assert_eq!(snap.messages.last().map(|m| m.content.as_str()), Some("fast"));
        assert!(!snap.messages.iter().any(|m| m.content == "slow"));
        assert!(!snap.sending);
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_failed_send_keeps_compose_state() {
        let fake = seeded();
        let (ctrl, mut rx) = controller(&fake);
        ctrl.mount("7").await;
        drain(&mut rx);

        fake.fail_next_send(ClientError::Validation("Message is too long".into()));
        ctrl.set_draft("hello");
        assert!(ctrl.send().await.is_err());

        let snap = ctrl.snapshot();
        assert_eq!(snap.draft, "hello");
        assert_eq!(snap.messages.len(), 3);
        assert_eq!(snap.phase, Phase::Ready);
        assert_eq!(
            drain(&mut rx),
            vec![RoomEvent::Notify(Notification::error("Message is too long"))]
        );

        fake.fail_next_send(ClientError::Server { status: 500, detail: String::new() });
        assert!(ctrl.send().await.is_err());
        assert_eq!(
            drain(&mut rx),
            vec![RoomEvent::Notify(Notification::error("Failed to send message"))]
        );
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_poll_same_count_is_ignored() {
        let fake = seeded();
        let (ctrl, mut rx) = controller(&fake);
        ctrl.mount("7").await;
        drain(&mut rx);
        let before = ctrl.snapshot();

        assert!(!ctrl.poll_once().await);
        assert_eq!(ctrl.snapshot(), before);
        assert_eq!(fake.mark_read_calls(), 1);
        assert!(drain(&mut rx).is_empty());
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_poll_larger_count_replaces_and_marks_read_once() {
        let fake = seeded();
        let (ctrl, mut rx) = controller(&fake);
        ctrl.mount("7").await;
        drain(&mut rx);

        fake.set_latest(page(&[6, 5, 4, 3], true));
        assert!(ctrl.poll_once().await);
        assert_eq!(ids(&ctrl.snapshot().messages), vec![3, 4, 5, 6]);
        assert_eq!(fake.mark_read_calls(), 2);
        assert_eq!(
            drain(&mut rx),
            vec![RoomEvent::MessagesUpdated { room_id: RoomId(7), count: 4 }]
        );
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_poll_failure_is_silent() {
        let fake = seeded();
        let (ctrl, mut rx) = controller(&fake);
        ctrl.mount("7").await;
        drain(&mut rx);

        fake.fail_next_list(ClientError::Server { status: 502, detail: String::new() });
        assert!(!ctrl.poll_once().await);
        assert_eq!(ctrl.phase(), Phase::Ready);
        assert!(drain(&mut rx).is_empty());
        ctrl.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_picks_up_new_messages() {
        let fake = seeded();
        let (ctrl, _rx) = controller(&fake);
        ctrl.mount("7").await;

        fake.set_latest(page(&[6, 5, 4, 3], true));
        tokio::time::sleep(POLL + Duration::from_millis(100)).await;
        assert_eq!(ids(&ctrl.snapshot().messages), vec![3, 4, 5, 6]);
        ctrl.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_remount_discards_stale_older_page() {
        let fake = seeded();
        let other = FakeTransport::room(9);
        fake.add_room(other);
        let (ctrl, _rx) = controller(&fake);
        ctrl.mount("7").await;
        fake.set_latency(Duration::from_millis(50));

        let older = ctrl.load_older();
        let remount = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            ctrl.mount("9").await
        };
        let (loaded, phase) = tokio::join!(older, remount);

        assert!(!loaded);
        assert_eq!(phase, Phase::Ready);
        let snap = ctrl.snapshot();
        assert_eq!(snap.room_id, Some(RoomId(9)));
        assert!(!snap.messages.iter().any(|m| m.id == MessageId(1)));
        assert_eq!(snap.page, 1);
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_sent_message_appends_for_own_user() {
        let fake = seeded();
        let (ctrl, _rx) = controller(&fake);
        ctrl.mount("7").await;

        ctrl.set_draft("mine");
        let sent = ctrl.send().await.unwrap().unwrap();
        assert!(sent.is_from(CURRENT_USER));
        ctrl.unmount().await;
    }

    #[tokio::test]
    async fn test_drop_aborts_poller() {
        let fake = seeded();
        let (ctrl, _rx) = controller(&fake);
        ctrl.mount("7").await;
        drop(ctrl);
        // The poller held the only other reference to the transport.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(Arc::strong_count(&fake), 1);
    }

    #[test]
    fn test_send_failure_text() {
        assert_eq!(send_failure_text(&ClientError::Forbidden), "Failed to send message");
        assert_eq!(
            send_failure_text(&ClientError::Validation("too long".into())),
            "too long"
        );
    }

    #[test]
    fn test_flight_guard_releases_on_drop() {
        let flag = AtomicU64::new(0);
        {
            let _guard = FlightGuard::try_acquire(&flag, 1).unwrap();
            assert!(FlightGuard::try_acquire(&flag, 1).is_none());
            assert!(held_by(&flag, 1));
        }
        assert!(!held_by(&flag, 1));
        assert!(FlightGuard::try_acquire(&flag, 1).is_some());
    }

    #[test]
    fn test_flight_guard_newer_epoch_takes_over() {
        let flag = AtomicU64::new(0);
        let stale = FlightGuard::try_acquire(&flag, 1).unwrap();
        let current = FlightGuard::try_acquire(&flag, 2).unwrap();
        assert!(held_by(&flag, 2));

        // The stale holder finishing must not release the current one.
        drop(stale);
        assert!(held_by(&flag, 2));
        drop(current);
        assert_eq!(flag.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_message_ids_helper() {
        assert_eq!(ids(&[msg(2, 1), msg(1, 1)]), vec![2, 1]);
    }
}
