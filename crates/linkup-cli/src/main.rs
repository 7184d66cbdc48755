//! # linkup
//!
//! Terminal front end for the LinkUp social network:
//! - **Account**: password, registration and Google login, session persistence
//! - **Chat**: the rooms list and a live chat room with polling and attachments
//! - **People**: profiles, followers, following, search, follow requests and notifications

mod chat;
mod commands;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use linkup_client::{init_tracing, ClientConfig, HttpApi, SessionStore, DEFAULT_LOG_FILTER};
use linkup_shared::constants::APP_NAME;
use linkup_shared::protocol::FollowAction;
use linkup_shared::UserId;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "linkup", version, about = "LinkUp from the terminal")]
struct Cli {
    /// API root, overrides LINKUP_API_URL
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        username: Option<String>,
        /// student, alumni, ...
        #[arg(long)]
        user_type: Option<String>,
    },
    /// Log in with a Google ID token
    Google {
        #[arg(long)]
        token: String,
    },
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List chat rooms
    Rooms {
        #[arg(long)]
        page: Option<u32>,
    },
    /// Open a chat room
    Chat {
        room_id: String,
    },
    /// Show a profile, or update your own with the flags
    Profile {
        user_id: u64,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        graduation_year: Option<u16>,
    },
    Followers {
        user_id: u64,
        /// Follow `next` links until the end
        #[arg(long)]
        all: bool,
    },
    Following {
        user_id: u64,
        #[arg(long)]
        all: bool,
    },
    /// Send a follow request
    Follow {
        user_id: u64,
    },
    Unfollow {
        user_id: u64,
    },
    /// Search users by name or email
    Search {
        query: String,
    },
    /// List your notifications
    Notifications {
        #[arg(long)]
        unread: bool,
    },
    /// Accept a follow request (id shown by `notifications`)
    Accept {
        request_id: u64,
    },
    /// Decline a follow request
    Decline {
        request_id: u64,
    },
    /// Mark a notification as read
    ReadNotification {
        notification_id: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing(DEFAULT_LOG_FILTER);

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    debug!(?config, "Loaded configuration");

    let store = match config.session_path.clone() {
        Some(path) => SessionStore::new(path),
        None => SessionStore::default_location()?,
    };
    let api = HttpApi::new(&config)?.with_store(store);
    info!(api = %api.base_url(), authenticated = api.is_authenticated(), "{APP_NAME} client ready");

    match cli.command {
        Command::Login { email, password } => commands::login(&api, &email, &password).await,
        Command::Register {
            email,
            password,
            first_name,
            last_name,
            username,
            user_type,
        } => {
            let registration = linkup_shared::protocol::Registration {
                email,
                password,
                first_name,
                last_name,
                username,
                user_type,
            };
            commands::register(&api, &registration).await
        }
        Command::Google { token } => commands::google(&api, &token).await,
        Command::Logout => commands::logout(&api).await,
        Command::Whoami => commands::whoami(&api).await,
        Command::Rooms { page } => commands::rooms(&api, page).await,
        Command::Chat { room_id } => {
            chat::run(Arc::new(api), &room_id, config.poll_interval).await
        }
        Command::Profile {
            user_id,
            bio,
            department,
            graduation_year,
        } => {
            let update = linkup_shared::protocol::ProfileUpdate {
                bio,
                department,
                graduation_year,
                ..Default::default()
            };
            commands::profile(&api, UserId(user_id), update).await
        }
        Command::Followers { user_id, all } => {
            commands::connections(&api, UserId(user_id), commands::Direction::Followers, all).await
        }
        Command::Following { user_id, all } => {
            commands::connections(&api, UserId(user_id), commands::Direction::Following, all).await
        }
        Command::Follow { user_id } => commands::follow(&api, UserId(user_id)).await,
        Command::Unfollow { user_id } => commands::unfollow(&api, UserId(user_id)).await,
        Command::Search { query } => commands::search(&api, &query).await,
        Command::Notifications { unread } => commands::notifications(&api, unread).await,
        Command::Accept { request_id } => {
            commands::respond(&api, request_id, FollowAction::Accept).await
        }
        Command::Decline { request_id } => {
            commands::respond(&api, request_id, FollowAction::Decline).await
        }
        Command::ReadNotification { notification_id } => {
            commands::read_notification(&api, notification_id).await
        }
    }
}
