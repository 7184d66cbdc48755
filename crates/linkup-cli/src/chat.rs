//! Interactive chat room on stdin/stdout.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use linkup_client::chat::render::{self, Align, MessageBubble};
use linkup_client::{ChatRoomController, HttpApi, NotifyLevel, Phase, RoomEvent};
use linkup_shared::{MessageId, UserId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

const HELP: &str = "Commands: /older  /attach <path>  /detach  /quit  (anything else is sent)";

pub async fn run(api: Arc<HttpApi>, room_id: &str, poll_interval: Duration) -> anyhow::Result<()> {
    let Some(me) = api.session().and_then(|s| s.user).map(|u| u.id) else {
        bail!("Not logged in. Run `linkup login` first.");
    };

    let (controller, mut events) = ChatRoomController::new(api, poll_interval);
    let mut printed: HashSet<MessageId> = HashSet::new();

    // Redirects are reported by the event loop below.
    if controller.mount(room_id).await == Phase::Error {
        let error = controller.snapshot().error;
        bail!(error.unwrap_or_else(|| "Failed to load messages".into()));
    }

    let snapshot = controller.snapshot();
    if let Some(ref room) = snapshot.room {
        let header = render::header(room);
        println!("== {} <{}> ==", header.name, header.email);
    }
    if snapshot.has_more {
        println!("(older messages available, type /older)");
    }
    println!("{HELP}");
    print_new(&controller, me, &mut printed);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&controller, line.trim_end()).await {
                    break;
                }
            }
            Some(event) = events.recv() => match event {
                RoomEvent::MessagesUpdated { .. } => print_new(&controller, me, &mut printed),
                RoomEvent::MessageSent { message, .. } => {
                    debug!(message = %message.id, "Sent");
                }
                RoomEvent::Notify(note) => {
                    let tag = match note.level {
                        NotifyLevel::Info => "info",
                        NotifyLevel::Warning => "warning",
                        NotifyLevel::Error => "error",
                    };
                    eprintln!("[{tag}] {}", note.text);
                }
                RoomEvent::Redirect(target) => {
                    eprintln!("Leaving room, go to {}", target.route());
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    controller.unmount().await;
    Ok(())
}

/// Returns false when the user asked to leave.
async fn handle_line(controller: &ChatRoomController<HttpApi>, line: &str) -> bool {
    match line.split_once(' ').unwrap_or((line, "")) {
        ("/quit", _) => return false,
        ("/older", _) => {
            if !controller.load_older().await && !controller.snapshot().has_more {
                println!("(no older messages)");
            }
        }
        ("/attach", path) if !path.trim().is_empty() => {
            if controller.select_attachment_path(path.trim()).await.is_ok() {
                if let Some(info) = controller.snapshot().attachment {
                    println!("(attached {} {}, {} bytes)", info.file_name, info.mime_type, info.size);
                }
            }
        }
        ("/attach", _) => println!("usage: /attach <path>"),
        ("/detach", _) => controller.clear_attachment(),
        ("/help", _) => println!("{HELP}"),
        _ => {
            controller.set_draft(line);
            if !controller.snapshot().can_send() {
                return true;
            }
            // Failures are reported through Notify events.
            let _ = controller.send().await;
        }
    }
    true
}

fn print_new(controller: &ChatRoomController<HttpApi>, me: UserId, printed: &mut HashSet<MessageId>) {
    let snapshot = controller.snapshot();
    for (message, bubble) in snapshot
        .messages
        .iter()
        .zip(render::timeline(&snapshot, me))
    {
        if printed.insert(message.id) {
            println!("{}", format_bubble(&bubble));
        }
    }
}

fn format_bubble(bubble: &MessageBubble) -> String {
    let mut parts = Vec::new();
    if let Some(ref media) = bubble.media {
        parts.push(format!("[{:?} {} bytes]", media.kind, media.data_url.len()));
    }
    if let Some(ref text) = bubble.text {
        parts.push(text.clone());
    }
    let body = parts.join(" ");
    match bubble.align {
        Align::Right => format!("{:>60}  {}", body, bubble.time),
        Align::Left => format!("{}  {}", body, bubble.time),
    }
}
