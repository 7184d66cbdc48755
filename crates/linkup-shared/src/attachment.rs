//! Chat attachments: a single image or video blob sent inline with a
//! message as standard base64 text.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::constants::{IMAGE_MIME_PREFIX, MAX_ATTACHMENT_SIZE, VIDEO_MIME_PREFIX};
use crate::error::SharedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Other,
}

impl AttachmentKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with(IMAGE_MIME_PREFIX) {
            Self::Image
        } else if mime.starts_with(VIDEO_MIME_PREFIX) {
            Self::Video
        } else {
            Self::Other
        }
    }

    pub fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }
}

/// A file selected for the next outgoing message.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read an attachment from disk.
    ///
    /// The size limit is checked against file metadata before any bytes are
    /// read, and the MIME type is inferred from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SharedError> {
        let path = path.as_ref();

        let mime_type = mime_from_extension(path).ok_or_else(|| {
            SharedError::UnsupportedMediaType(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            )
        })?;

        let metadata = tokio::fs::metadata(path).await?;
        check_size(metadata.len())?;

        let data = tokio::fs::read(path).await?;
        // The file may have grown between the two calls
        check_size(data.len() as u64)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self::new(file_name, mime_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_mime(&self.mime_type)
    }

    /// Check size and media type against the chat limits.
    pub fn validate(&self) -> Result<(), SharedError> {
        check_size(self.size())?;
        if !self.kind().is_media() {
            return Err(SharedError::UnsupportedMediaType(self.mime_type.clone()));
        }
        Ok(())
    }

    /// Standard padded base64 of the raw bytes.
    pub fn encode(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

pub fn check_size(size: u64) -> Result<(), SharedError> {
    if size > MAX_ATTACHMENT_SIZE as u64 {
        return Err(SharedError::AttachmentTooLarge {
            size,
            max: MAX_ATTACHMENT_SIZE,
        });
    }
    Ok(())
}

/// `data:` URL for an already-encoded payload.
pub fn data_url(mime_type: &str, base64_data: &str) -> String {
    format!("data:{mime_type};base64,{base64_data}")
}

/// MIME type for the image and video extensions the chat accepts.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "ogv" => "video/ogg",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => return None,
    };
    Some(mime)
}
