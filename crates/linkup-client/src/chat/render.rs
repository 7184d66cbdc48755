//! View models for the chat room: message bubbles and the header.
//!
//! Nothing here touches the network or the controller; callers pass the
//! snapshot and the current user id in.

use chrono::{DateTime, Local, TimeZone, Utc};
use linkup_shared::attachment::data_url;
use linkup_shared::protocol::{ChatRoom, Message};
use linkup_shared::{AttachmentKind, UserId};

use crate::chat::state::RoomSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub kind: MediaKind,
    pub data_url: String,
}

/// One rendered message. Media goes above the text, the time below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBubble {
    pub own: bool,
    pub align: Align,
    pub media: Option<Media>,
    pub text: Option<String>,
    pub time: String,
}

pub fn bubble(message: &Message, current_user: UserId) -> MessageBubble {
    bubble_in(message, current_user, &Local)
}

fn bubble_in<Tz: TimeZone>(message: &Message, current_user: UserId, tz: &Tz) -> MessageBubble
where
    Tz::Offset: std::fmt::Display,
{
    let own = message.is_from(current_user);
    MessageBubble {
        own,
        align: if own { Align::Right } else { Align::Left },
        media: media(message),
        text: (!message.content.is_empty()).then(|| message.content.clone()),
        time: format_time_in(&message.created_at, tz),
    }
}

fn media(message: &Message) -> Option<Media> {
    let (mime, data) = match (&message.file_type, &message.file_data) {
        (Some(mime), Some(data)) => (mime, data),
        _ => return None,
    };
    let kind = match message.attachment_kind()? {
        AttachmentKind::Image => MediaKind::Image,
        AttachmentKind::Video => MediaKind::Video,
        AttachmentKind::Other => return None,
    };
    Some(Media {
        kind,
        data_url: data_url(mime, data),
    })
}

/// Every displayed message, oldest first.
pub fn timeline(snapshot: &RoomSnapshot, current_user: UserId) -> Vec<MessageBubble> {
    snapshot
        .messages
        .iter()
        .map(|m| bubble(m, current_user))
        .collect()
}

/// Who the room is with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub email: String,
    pub photo_url: Option<String>,
    /// Placeholder letter when there is no photo.
    pub initial: Option<char>,
}

pub fn header(room: &ChatRoom) -> Header {
    let user = &room.other_user;
    let name = [user.full_name.as_str(), user.first_name.as_deref().unwrap_or("")]
        .into_iter()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(user.email.as_str())
        .to_string();

    let photo_url = user.profile_photo.clone().filter(|p| !p.is_empty());
    Header {
        name,
        email: user.email.clone(),
        initial: if photo_url.is_none() { user.initial() } else { None },
        photo_url,
    }
}

/// `h:mm AM` in the local time zone.
pub fn format_time(ts: &DateTime<Utc>) -> String {
    format_time_in(ts, &Local)
}

pub fn format_time_in<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.with_timezone(tz).format("%-I:%M %p").to_string()
}
