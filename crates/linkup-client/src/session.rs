//! Persistence of the authenticated session (JWT pair + cached user).
//!
//! The session file lives in the platform data directory unless an
//! explicit path is configured:
//! - Linux:   `~/.local/share/linkup/session.json`
//! - macOS:   `~/Library/Application Support/com.linkup.linkup/session.json`
//! - Windows: `{FOLDERID_RoamingAppData}\linkup\linkup\data\session.json`

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use linkup_shared::protocol::{AuthResponse, UserProfile};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

// Tokens stay out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user.as_ref().map(|u| u.id))
            .finish_non_exhaustive()
    }
}

impl From<AuthResponse> for Session {
    fn from(resp: AuthResponse) -> Self {
        Self {
            access: resp.access,
            refresh: resp.refresh,
            user: Some(resp.user),
        }
    }
}

/// JSON file holding the current session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located in the platform data directory.
    pub fn default_location() -> Result<Self> {
        let project_dirs = ProjectDirs::from("com", "linkup", "linkup")
            .ok_or_else(|| ClientError::Session("Could not determine data directory".into()))?;
        Ok(Self::new(project_dirs.data_dir().join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session; a missing file means "logged out".
    pub fn load(&self) -> Result<Option<Session>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_str(&json)
            .map_err(|e| ClientError::Session(format!("Corrupt session file: {e}")))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| ClientError::Session(format!("Serialization failed: {e}")))?;
        std::fs::write(&self.path, json)?;
        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
