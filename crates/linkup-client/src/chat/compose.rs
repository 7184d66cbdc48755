//! Turning the draft and pending attachment into a send request.

use linkup_shared::protocol::OutgoingMessage;
use linkup_shared::Attachment;

use crate::error::{ClientError, Result};

/// Non-blank text or a file is required.
pub fn is_sendable(draft: &str, attachment: Option<&Attachment>) -> bool {
    !draft.trim().is_empty() || attachment.is_some()
}

/// Build the request body. The attachment is base64-encoded on the
/// blocking pool so large files do not stall the event loop.
pub async fn encode(draft: &str, attachment: Option<Attachment>) -> Result<OutgoingMessage> {
    let mut message = OutgoingMessage::text(draft.trim());

    if let Some(attachment) = attachment {
        let (attachment, file_data) = tokio::task::spawn_blocking(move || {
            let encoded = attachment.encode();
            (attachment, encoded)
        })
        .await
        .map_err(|e| ClientError::Io(std::io::Error::other(format!("Encoding failed: {e}"))))?;

        message.file_data = Some(file_data);
        message.file_type = Some(attachment.mime_type);
        message.file_name = Some(attachment.file_name);
    }

    Ok(message)
}
