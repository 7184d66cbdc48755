//! One-shot subcommands: account, rooms list and people.

use anyhow::{bail, Context};
use linkup_client::chat::render::format_time;
use linkup_client::HttpApi;
use linkup_shared::protocol::{
    FollowAction, FollowStatus, NotificationKind, ProfileUpdate, Registration, UserProfile,
};
use linkup_shared::UserId;

pub async fn login(api: &HttpApi, email: &str, password: &str) -> anyhow::Result<()> {
    let user = api.login(email, password).await.context("Login failed")?;
    println!("Logged in as {} <{}>", user.display_name(), user.email);
    Ok(())
}

pub async fn register(api: &HttpApi, registration: &Registration) -> anyhow::Result<()> {
    let user = api
        .register(registration)
        .await
        .context("Registration failed")?;
    println!("Welcome, {}! Your account id is {}.", user.display_name(), user.id);
    Ok(())
}

pub async fn google(api: &HttpApi, token: &str) -> anyhow::Result<()> {
    let user = api
        .google_login(token)
        .await
        .context("Google sign-in failed")?;
    println!("Logged in as {} <{}>", user.display_name(), user.email);
    Ok(())
}

pub async fn logout(api: &HttpApi) -> anyhow::Result<()> {
    api.logout().await?;
    println!("Logged out");
    Ok(())
}

pub async fn whoami(api: &HttpApi) -> anyhow::Result<()> {
    require_login(api)?;
    let user = api.current_user().await?;
    print_profile(&user);
    Ok(())
}

pub async fn rooms(api: &HttpApi, page: Option<u32>) -> anyhow::Result<()> {
    require_login(api)?;
    let rooms = api.list_rooms(page).await?;
    if rooms.results.is_empty() {
        println!("No conversations yet");
        return Ok(());
    }
    for room in &rooms.results {
        let preview = room
            .last_message
            .as_ref()
            .map(|m| {
                if m.content.is_empty() && m.has_attachment() {
                    format!("[file] {}", format_time(&m.created_at))
                } else {
                    format!("{} {}", m.content, format_time(&m.created_at))
                }
            })
            .unwrap_or_default();
        let unread = if room.unread_count > 0 {
            format!(" ({} unread)", room.unread_count)
        } else {
            String::new()
        };
        println!(
            "#{:<5} {}{}  {}",
            room.id, room.other_user.full_name, unread, preview
        );
    }
    if rooms.has_more() {
        println!("-- more: --page {}", page.unwrap_or(1) + 1);
    }
    Ok(())
}

pub async fn profile(api: &HttpApi, user_id: UserId, update: ProfileUpdate) -> anyhow::Result<()> {
    require_login(api)?;
    let user = if update == ProfileUpdate::default() {
        api.profile(user_id).await?
    } else {
        api.update_profile(user_id, &update).await?
    };
    print_profile(&user);

    let me = api.session().and_then(|s| s.user).map(|u| u.id);
    if me != Some(user_id) {
        let status = api.follow_status(user_id).await?;
        let label = match status {
            FollowStatus::Following => "following",
            FollowStatus::Requested => "follow request pending",
            FollowStatus::None => "not following",
        };
        println!("  you: {label}");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub enum Direction {
    Followers,
    Following,
}

pub async fn connections(
    api: &HttpApi,
    user_id: UserId,
    direction: Direction,
    all: bool,
) -> anyhow::Result<()> {
    require_login(api)?;
    let mut next: Option<String> = None;
    let mut shown = 0usize;
    loop {
        let page = match direction {
            Direction::Followers => api.followers(user_id, next.as_deref()).await?,
            Direction::Following => api.following(user_id, next.as_deref()).await?,
        };
        for user in &page.results {
            print_user_line(user);
        }
        shown += page.results.len();
        next = page.next;
        if !all || next.is_none() {
            break;
        }
    }
    if shown == 0 {
        println!("Nobody here yet");
    } else if next.is_some() {
        println!("-- more available, pass --all");
    }
    Ok(())
}

pub async fn follow(api: &HttpApi, user_id: UserId) -> anyhow::Result<()> {
    require_login(api)?;
    api.follow(user_id).await?;
    println!("Follow request sent");
    Ok(())
}

pub async fn unfollow(api: &HttpApi, user_id: UserId) -> anyhow::Result<()> {
    require_login(api)?;
    api.unfollow(user_id).await?;
    println!("Unfollowed");
    Ok(())
}

pub async fn respond(api: &HttpApi, request_id: u64, action: FollowAction) -> anyhow::Result<()> {
    require_login(api)?;
    api.respond_to_follow_request(request_id, action).await?;
    match action {
        FollowAction::Accept => println!("Follow request accepted"),
        FollowAction::Decline => println!("Follow request declined"),
    }
    Ok(())
}

pub async fn notifications(api: &HttpApi, unread_only: bool) -> anyhow::Result<()> {
    require_login(api)?;
    let list = api.notifications().await?;
    let mut shown = 0usize;
    for n in list.iter().filter(|n| !unread_only || !n.is_read) {
        let marker = if n.is_read { ' ' } else { '*' };
        println!("{marker} #{:<5} {}  {}", n.id, n.title, format_time(&n.created_at));
        if !n.message.is_empty() {
            println!("         {}", n.message);
        }
        if let (NotificationKind::FollowRequest, Some(request)) = (n.kind, n.related_id) {
            println!("         linkup accept {request}  |  linkup decline {request}");
        }
        shown += 1;
    }
    if shown == 0 {
        println!("No notifications");
    }
    Ok(())
}

pub async fn read_notification(api: &HttpApi, notification_id: u64) -> anyhow::Result<()> {
    require_login(api)?;
    api.mark_notification_read(notification_id).await?;
    println!("Marked as read");
    Ok(())
}

pub async fn search(api: &HttpApi, query: &str) -> anyhow::Result<()> {
    require_login(api)?;
    let users = api.search(query).await?;
    if users.is_empty() {
        println!("No users found");
    }
    for user in &users {
        print_user_line(user);
    }
    Ok(())
}

fn require_login(api: &HttpApi) -> anyhow::Result<()> {
    if !api.is_authenticated() {
        bail!("Not logged in. Run `linkup login` first.");
    }
    Ok(())
}

fn print_user_line(user: &UserProfile) {
    println!("#{:<5} {} <{}>", user.id, user.display_name(), user.email);
}

fn print_profile(user: &UserProfile) {
    println!("{} <{}>  #{}", user.display_name(), user.email, user.id);
    println!("  role: {:?}", user.role());
    if let Some(ref department) = user.department {
        println!("  department: {department}");
    }
    if let Some(year) = user.graduation_year {
        println!("  class of {year}");
    }
    if let Some(ref bio) = user.bio {
        println!("  {bio}");
    }
    println!(
        "  {} followers, {} following",
        user.followers_count, user.following_count
    );
}
