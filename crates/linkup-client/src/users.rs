//! Profiles, the follow graph and user search.

use linkup_shared::constants::{
    FOLLOW_ACCEPTED, FOLLOW_DECLINED, FOLLOW_REQUEST_SENT, NOTIFICATION_READ, UNFOLLOWED,
};
use linkup_shared::protocol::{
    FollowAction, FollowRequest, FollowRequestAction, FollowResponse, FollowStatus,
    FollowStatusResponse, Paginated, ProfileUpdate, UserNotification, UserProfile,
};
use linkup_shared::UserId;
use serde::Deserialize;
use tracing::info;

use crate::api::HttpApi;
use crate::error::{ClientError, Result};

/// Search results arrive either bare or wrapped in a page.
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResults {
    Page(Paginated<UserProfile>),
    List(Vec<UserProfile>),
}

impl HttpApi {
    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile> {
        self.get_json(&format!("/auth/profile/{user_id}/")).await
    }

    pub async fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> Result<UserProfile> {
        let profile: UserProfile = self
            .patch_json(&format!("/auth/profile/{user_id}/"), update)
            .await?;
        info!(user = %user_id, "Profile updated");
        Ok(profile)
    }

    /// Send a follow request; the target has to accept it.
    pub async fn follow(&self, user_id: UserId) -> Result<()> {
        let resp: FollowResponse = self
            .post_json("/auth/follow/", &FollowRequest { user_id })
            .await?;
        expect_status(resp, FOLLOW_REQUEST_SENT, "Failed to follow user")?;
        info!(user = %user_id, "Follow request sent");
        Ok(())
    }

    pub async fn unfollow(&self, user_id: UserId) -> Result<()> {
        let resp: FollowResponse = self
            .post_json("/auth/unfollow/", &FollowRequest { user_id })
            .await?;
        expect_status(resp, UNFOLLOWED, "Failed to unfollow user")?;
        info!(user = %user_id, "Unfollowed");
        Ok(())
    }

    /// Accept or decline a pending follow request sent to the current user.
    ///
    /// `request_id` is the `related_id` of the matching notification.
    pub async fn respond_to_follow_request(&self, request_id: u64, action: FollowAction) -> Result<()> {
        let body = FollowRequestAction { request_id, action };
        let resp: FollowResponse = self.post_json("/auth/handle-follow-request/", &body).await?;
        let expected = match action {
            FollowAction::Accept => FOLLOW_ACCEPTED,
            FollowAction::Decline => FOLLOW_DECLINED,
        };
        expect_status(resp, expected, "Failed to handle follow request")?;
        info!(request = request_id, ?action, "Follow request handled");
        Ok(())
    }

    /// Notifications of the current user, newest first.
    pub async fn notifications(&self) -> Result<Vec<UserNotification>> {
        self.get_json("/auth/notifications/").await
    }

    pub async fn mark_notification_read(&self, notification_id: u64) -> Result<()> {
        let resp: FollowResponse = self
            .post_json(&format!("/auth/notifications/{notification_id}/read/"), &serde_json::json!({}))
            .await?;
        expect_status(resp, NOTIFICATION_READ, "Failed to mark notification as read")
    }

    pub async fn follow_status(&self, user_id: UserId) -> Result<FollowStatus> {
        let resp: FollowStatusResponse = self
            .get_json(&format!("/auth/follow-status/{user_id}/"))
            .await?;
        Ok(resp.status)
    }

    /// Followers of a user. Pass the previous page's `next` link to continue.
    pub async fn followers(&self, user_id: UserId, next: Option<&str>) -> Result<Paginated<UserProfile>> {
        match next {
            Some(url) => self.get_absolute(url).await,
            None => self.get_json(&format!("/auth/followers/{user_id}/")).await,
        }
    }

    /// Users followed by a user. Pass the previous page's `next` link to continue.
    pub async fn following(&self, user_id: UserId, next: Option<&str>) -> Result<Paginated<UserProfile>> {
        match next {
            Some(url) => self.get_absolute(url).await,
            None => self.get_json(&format!("/auth/following/{user_id}/")).await,
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<UserProfile>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let results: SearchResults = self.get_query("/auth/search/", &[("q", query)]).await?;
        Ok(match results {
            SearchResults::Page(page) => page.results,
            SearchResults::List(users) => users,
        })
    }
}

fn expect_status(resp: FollowResponse, expected: &str, fallback: &str) -> Result<()> {
    if resp.status.as_deref() == Some(expected) {
        return Ok(());
    }
    Err(ClientError::Validation(
        resp.error.unwrap_or_else(|| fallback.to_string()),
    ))
}
