/// Application name
pub const APP_NAME: &str = "LinkUp";

/// Maximum attachment size in bytes (5 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 5 * 1024 * 1024;

/// Interval between two polls of the latest message page, in seconds
pub const POLL_INTERVAL_SECS: u64 = 5;

/// HTTP request timeout, in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default REST API root
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Follow endpoint status values
pub const FOLLOW_REQUEST_SENT: &str = "follow_request_sent";
pub const UNFOLLOWED: &str = "unfollowed";
pub const FOLLOW_ACCEPTED: &str = "accepted";
pub const FOLLOW_DECLINED: &str = "declined";

/// Status of a successful mark-notification-read call
pub const NOTIFICATION_READ: &str = "success";

/// MIME prefixes accepted for chat attachments
pub const IMAGE_MIME_PREFIX: &str = "image/";
pub const VIDEO_MIME_PREFIX: &str = "video/";
