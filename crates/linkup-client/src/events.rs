use linkup_shared::protocol::Message;
use linkup_shared::RoomId;
use tokio::sync::mpsc;

/// Fallback views the hosting shell navigates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    /// The rooms list (`/messages`).
    Rooms,
    /// The login page.
    Login,
}

impl RedirectTarget {
    pub fn route(self) -> &'static str {
        match self {
            Self::Rooms => "/messages",
            Self::Login => "/login",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

/// A transient, user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotifyLevel,
    pub text: String,
}

impl Notification {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Error,
            text: text.into(),
        }
    }
}

/// Events the chat controller sends to its hosting view.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// Leave the room and show the given view instead.
    Redirect(RedirectTarget),
    Notify(Notification),
    /// The displayed message sequence changed.
    MessagesUpdated { room_id: RoomId, count: usize },
    /// A message was accepted by the server; lets the rooms list refresh its preview.
    MessageSent { room_id: RoomId, message: Message },
}

pub type EventSender = mpsc::UnboundedSender<RoomEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<RoomEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event, logging when the host has gone away.
pub fn emit_event(tx: &EventSender, event: RoomEvent) {
    if let Err(e) = tx.send(event) {
        tracing::debug!(event = ?e.0, "Event dropped, host receiver closed");
    }
}
