use linkup_shared::SharedError;
use thiserror::Error;

use crate::events::RedirectTarget;

/// Errors produced by the REST client and the chat controller.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Malformed or missing room identifier; never reaches the network.
    #[error("Invalid room id: {0:?}")]
    InvalidRoom(String),

    /// HTTP 403: the caller is not allowed to see the resource.
    #[error("Forbidden")]
    Forbidden,

    /// HTTP 404.
    #[error("Not found")]
    NotFound,

    /// HTTP 401: missing or expired session.
    #[error("Authentication required")]
    Unauthorized,

    /// Request rejected before or by the server (HTTP 400).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Attachment above the client-side size limit.
    #[error("File too large: {size} bytes (max {max})")]
    AttachmentTooLarge { size: u64, max: usize },

    /// Any other non-success HTTP status.
    #[error("Server error {status}: {detail}")]
    Server { status: u16, detail: String },

    /// Connection, TLS or timeout failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Session file could not be read or written.
    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Shared(SharedError),
}

impl From<SharedError> for ClientError {
    fn from(e: SharedError) -> Self {
        match e {
            SharedError::AttachmentTooLarge { size, max } => Self::AttachmentTooLarge { size, max },
            SharedError::InvalidRoomId(raw) => Self::InvalidRoom(raw),
            SharedError::UnsupportedMediaType(mime) => {
                Self::Validation(format!("Unsupported file type: {mime}"))
            }
            other => Self::Shared(other),
        }
    }
}

impl ClientError {
    /// Where the hosting shell should navigate after this error, if anywhere.
    pub fn redirect_target(&self) -> Option<RedirectTarget> {
        match self {
            Self::InvalidRoom(_) | Self::Forbidden | Self::NotFound => Some(RedirectTarget::Rooms),
            Self::Unauthorized => Some(RedirectTarget::Login),
            _ => None,
        }
    }

    /// Text suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(detail) => detail.clone(),
            Self::Server { detail, .. } if !detail.is_empty() => detail.clone(),
            Self::AttachmentTooLarge { .. } => "File size should be less than 5MB".to_string(),
            Self::Network(_) => "Could not reach the server".to_string(),
            Self::Unauthorized => "Please log in again".to_string(),
            other => other.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
