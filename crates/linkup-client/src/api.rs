//! Thin reqwest wrapper around the LinkUp REST API.
//!
//! [`HttpApi`] owns the HTTP client, the API root and the active session.
//! Domain modules ([`crate::transport`], [`crate::auth`], [`crate::users`])
//! add their endpoints on top of the generic helpers defined here.

use std::sync::{Arc, RwLock};

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::{Session, SessionStore};

/// Longest slice of a raw error body surfaced to users.
const MAX_DETAIL_LEN: usize = 200;

/// Authenticated REST client. Cheap to clone; clones share the session.
#[derive(Debug, Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    session: Arc<RwLock<Option<Session>>>,
    store: Option<SessionStore>,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("linkup-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session: Arc::new(RwLock::new(None)),
            store: None,
        })
    }

    /// Attach a session store and restore the session it holds.
    pub fn with_store(mut self, store: SessionStore) -> Self {
        match store.load() {
            Ok(session) => {
                debug!(restored = session.is_some(), path = %store.path().display(), "Session store attached");
                *self.session.write().unwrap_or_else(|e| e.into_inner()) = session;
            }
            Err(e) => warn!(error = %e, "Ignoring unreadable session file"),
        }
        self.store = Some(store);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Replace the active session, writing through to the store if any.
    pub fn set_session(&self, session: Option<Session>) -> Result<()> {
        if let Some(ref store) = self.store {
            match session {
                Some(ref s) => store.save(s)?,
                None => store.clear()?,
            }
        }
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = session;
        Ok(())
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.access.clone());
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_absolute(&self.url(path)).await
    }

    /// GET a fully-qualified URL, e.g. a `next` link returned by the server.
    ///
    /// The bearer token is only sent when the URL lies under the API root.
    pub(crate) async fn get_absolute<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(%url, "GET");
        let request = self.http.get(url);
        let request = if self.is_api_url(url) {
            self.authorize(request)
        } else {
            warn!(%url, "Link outside the API root, sending it without credentials");
            request
        };
        let resp = request.send().await?;
        decode(check_status(resp).await?).await
    }

    fn is_api_url(&self, url: &str) -> bool {
        url.strip_prefix(self.base_url.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }

    pub(crate) async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!(%url, "GET");
        let resp = self
            .authorize(self.http.get(&url).query(query))
            .send()
            .await?;
        decode(check_status(resp).await?).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, "POST");
        let resp = self.authorize(self.http.post(&url).json(body)).send().await?;
        decode(check_status(resp).await?).await
    }

    /// POST where only the status matters.
    pub(crate) async fn post_unit<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!(%url, "POST");
        let resp = self.authorize(self.http.post(&url).json(body)).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    pub(crate) async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, "PATCH");
        let resp = self.authorize(self.http.patch(&url).json(body)).send().await?;
        decode(check_status(resp).await?).await
    }
}

/// Map non-success statuses onto the client error taxonomy.
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let detail = extract_detail(&body);
    debug!(status = status.as_u16(), %detail, "Request failed");

    Err(match status {
        StatusCode::BAD_REQUEST => ClientError::Validation(detail),
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::FORBIDDEN => ClientError::Forbidden,
        StatusCode::NOT_FOUND => ClientError::NotFound,
        _ => ClientError::Server {
            status: status.as_u16(),
            detail,
        },
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Best human-readable message in an error body.
///
/// Looks at `detail`, then `error`, then the first field error of a
/// validation map (`{"content": ["This field is required."]}`), and finally
/// the raw body.
pub(crate) fn extract_detail(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error"] {
            if let Some(text) = map.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
        for (field, value) in &map {
            let text = match value {
                serde_json::Value::String(s) => Some(s.as_str()),
                serde_json::Value::Array(items) => items.iter().find_map(|v| v.as_str()),
                _ => None,
            };
            if let Some(text) = text {
                return if field == "non_field_errors" {
                    text.to_string()
                } else {
                    format!("{field}: {text}")
                };
            }
        }
    }

    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_DETAIL_LEN) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
