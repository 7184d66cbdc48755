use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("File too large: {size} bytes (max {max})")]
    AttachmentTooLarge { size: u64, max: usize },

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Invalid room id: {0:?}")]
    InvalidRoomId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
