use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use poller_engine::{remove_file_if_exists, AtomicFileWriter, PersistError, TokenProvider};
use poller_logging::{poller_info, poller_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to serialize session: {0}")]
    Serialize(String),
    #[error("session path {0:?} has no file name")]
    BadPath(PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
    saved_at: String,
}

/// Bearer credential kept in a small RON file between runs. Clearing it is
/// the "logged out" condition.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    token: RwLock<Option<String>>,
}

impl SessionStore {
    /// Reads the session file. Missing or unreadable files mean "logged out".
    pub fn load(path: &Path) -> Self {
        let token = read_session(path).map(|session| {
            if let Ok(saved) = DateTime::parse_from_rfc3339(&session.saved_at) {
                let age = Utc::now().signed_duration_since(saved.with_timezone(&Utc));
                poller_info!("Loaded session saved {} minutes ago", age.num_minutes());
            }
            session.token
        });
        Self {
            path: path.to_path_buf(),
            token: RwLock::new(token),
        }
    }

    /// A session seeded from outside (environment); it is not written to disk
    /// until `save` is called.
    pub fn with_token(path: &Path, token: String) -> Self {
        Self {
            path: path.to_path_buf(),
            token: RwLock::new(Some(token)),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.bearer_token().is_some()
    }

    pub fn save(&self, token: &str) -> Result<(), SessionError> {
        let session = PersistedSession {
            token: token.to_string(),
            saved_at: Utc::now().to_rfc3339(),
        };
        let content = ron::ser::to_string_pretty(&session, ron::ser::PrettyConfig::new())
            .map_err(|err| SessionError::Serialize(err.to_string()))?;

        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SessionError::BadPath(self.path.clone()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        AtomicFileWriter::new(dir).write(file_name, content.as_bytes())?;

        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.to_string());
        }
        Ok(())
    }

    /// Forgets the token in memory and on disk.
    pub fn clear(&self) -> Result<bool, SessionError> {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
        Ok(remove_file_if_exists(&self.path)?)
    }
}

impl TokenProvider for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .filter(|token| !token.trim().is_empty())
    }
}

fn read_session(path: &Path) -> Option<PersistedSession> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            poller_warn!("Failed to read session from {:?}: {}", path, err);
            return None;
        }
    };
    match ron::from_str(&content) {
        Ok(session) => Some(session),
        Err(err) => {
            poller_warn!("Failed to parse session from {:?}: {}", path, err);
            None
        }
    }
}
