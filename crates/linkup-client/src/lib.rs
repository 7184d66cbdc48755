//! LinkUp REST client and chat room controller.

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod transport;
pub mod users;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use api::HttpApi;
pub use chat::{ChatRoomController, Phase, RoomSnapshot};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use events::{Notification, NotifyLevel, RedirectTarget, RoomEvent};
pub use session::{Session, SessionStore};
pub use transport::ChatTransport;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "linkup_client=debug,linkup_cli=info,warn";

/// Install the global fmt subscriber. `RUST_LOG` overrides `default_filter`.
///
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
