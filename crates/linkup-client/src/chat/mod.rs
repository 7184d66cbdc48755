//! The chat room view: controller, compose helpers and render models.

pub mod compose;
pub mod controller;
pub mod render;
pub mod state;

pub use controller::ChatRoomController;
pub use state::{AttachmentInfo, Phase, RoomSnapshot};
