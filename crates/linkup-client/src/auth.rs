//! Authentication endpoints: password login, registration, Google token
//! exchange and logout.
//!
//! Successful logins replace the session held by [`HttpApi`] (and its
//! store, if one is attached).

use linkup_shared::protocol::{
    AuthResponse, GoogleLoginRequest, LoginRequest, LogoutRequest, Registration, UserProfile,
};
use tracing::{info, warn};

use crate::api::HttpApi;
use crate::error::{ClientError, Result};
use crate::session::Session;

impl HttpApi {
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let body = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let resp: AuthResponse = self.post_json("/auth/login/", &body).await?;
        self.establish(resp)
    }

    pub async fn register(&self, registration: &Registration) -> Result<UserProfile> {
        let resp: AuthResponse = self.post_json("/auth/register/", registration).await?;
        self.establish(resp)
    }

    /// Exchange a Google ID token for a LinkUp session.
    pub async fn google_login(&self, id_token: &str) -> Result<UserProfile> {
        let token = id_token.trim();
        if token.is_empty() {
            return Err(ClientError::Validation(
                "No authentication token found".into(),
            ));
        }
        let body = GoogleLoginRequest {
            token: token.to_string(),
        };
        let resp: AuthResponse = self.post_json("/auth/google/", &body).await?;
        self.establish(resp)
    }

    pub async fn current_user(&self) -> Result<UserProfile> {
        self.get_json("/auth/user/").await
    }

    /// Invalidate the refresh token server-side and forget the local session.
    ///
    /// The local session is cleared even when the server call fails.
    pub async fn logout(&self) -> Result<()> {
        if let Some(session) = self.session() {
            let body = LogoutRequest {
                refresh: session.refresh,
            };
            if let Err(e) = self.post_unit("/auth/logout/", &body).await {
                warn!(error = %e, "Logout request failed");
            }
        }
        self.set_session(None)?;
        info!("Logged out");
        Ok(())
    }

    fn establish(&self, resp: AuthResponse) -> Result<UserProfile> {
        if let Some(ref message) = resp.message {
            info!(user = %resp.user.id, %message, "Authenticated");
        } else {
            info!(user = %resp.user.id, "Authenticated");
        }
        let user = resp.user.clone();
        self.set_session(Some(Session::from(resp)))?;
        Ok(user)
    }
}
