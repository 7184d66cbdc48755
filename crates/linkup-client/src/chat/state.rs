//! Room state owned by the chat controller and the pure operations that
//! keep the displayed message sequence ordered oldest-first.

use std::collections::HashSet;

use linkup_shared::protocol::{ChatRoom, Message};
use linkup_shared::{Attachment, MessageId, RoomId};

/// Lifecycle of a mounted room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing mounted.
    Idle,
    Initializing,
    Ready,
    /// Ready, with an older page being fetched.
    LoadingOlder,
    /// Ready, with a message being sent.
    Sending,
    /// Initial load failed; no automatic recovery.
    Error,
    /// The host has been asked to navigate away.
    Redirecting,
}

impl Phase {
    /// Whether the room is displayed and accepts polls and user actions.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Ready | Self::LoadingOlder | Self::Sending)
    }
}

/// Name, type and size of the pending attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
}

impl From<&Attachment> for AttachmentInfo {
    fn from(a: &Attachment) -> Self {
        Self {
            file_name: a.file_name.clone(),
            mime_type: a.mime_type.clone(),
            size: a.size(),
        }
    }
}

/// Read-only copy of the room state handed to renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub phase: Phase,
    pub room_id: Option<RoomId>,
    pub room: Option<ChatRoom>,
    pub messages: Vec<Message>,
    pub page: u32,
    pub has_more: bool,
    pub loading: bool,
    pub sending: bool,
    pub error: Option<String>,
    pub draft: String,
    pub attachment: Option<AttachmentInfo>,
}

impl RoomSnapshot {
    /// Whether the compose form may be submitted.
    pub fn can_send(&self) -> bool {
        !self.sending && (!self.draft.trim().is_empty() || self.attachment.is_some())
    }
}

#[derive(Debug)]
pub(crate) struct RoomState {
    /// Mount epoch; responses tagged with an older epoch are discarded.
    pub epoch: u64,
    pub phase: Phase,
    pub room_id: Option<RoomId>,
    pub room: Option<ChatRoom>,
    pub messages: Vec<Message>,
    pub page: u32,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub draft: String,
    pub attachment: Option<Attachment>,
}

impl RoomState {
    pub fn new() -> Self {
        Self {
            epoch: 0,
            phase: Phase::Idle,
            room_id: None,
            room: None,
            messages: Vec::new(),
            page: 1,
            has_more: false,
            loading: false,
            error: None,
            draft: String::new(),
            attachment: None,
        }
    }

    /// Drop everything tied to the previous room and open a new epoch.
    pub fn reset(&mut self, room_id: Option<RoomId>, phase: Phase) -> u64 {
        let epoch = self.epoch.wrapping_add(1).max(1);
        *self = Self {
            epoch,
            phase,
            room_id,
            ..Self::new()
        };
        epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }
}

/// Server pages are newest-first; the display is oldest-first.
pub fn ascending(mut newest_first: Vec<Message>) -> Vec<Message> {
    newest_first.reverse();
    newest_first
}

/// Put an older page (newest-first) in front of the displayed sequence.
///
/// Messages already displayed are skipped so that existing entries keep
/// their position. Returns the number of messages added.
pub fn prepend_older(displayed: &mut Vec<Message>, older_newest_first: Vec<Message>) -> usize {
    let known: HashSet<MessageId> = displayed.iter().map(|m| m.id).collect();
    let mut older: Vec<Message> = ascending(older_newest_first)
        .into_iter()
        .filter(|m| !known.contains(&m.id))
        .collect();
    let added = older.len();
    older.append(displayed);
    *displayed = older;
    added
}

/// Append a freshly sent message unless the poller already brought it in.
pub fn append(displayed: &mut Vec<Message>, message: Message) -> bool {
    if displayed.iter().any(|m| m.id == message.id) {
        return false;
    }
    displayed.push(message);
    true
}
