//! Types shared by every LinkUp crate: REST wire models, identifiers,
//! attachment encoding and constants.

pub mod attachment;
pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use attachment::{Attachment, AttachmentKind};
pub use error::SharedError;
pub use types::{MessageId, RoomId, UserId};
