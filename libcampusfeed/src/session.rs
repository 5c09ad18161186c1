//! Session persistence for the CLI
//!
//! Keeps the signed-in session in a JSON file under the data directory so
//! separate command invocations share one session. Explicit sign-out
//! removes the file.

use std::path::PathBuf;

use tracing::debug;

use crate::config::resolve_data_path;
use crate::error::{ConfigError, Result};
use crate::types::Session;

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Session store at the default location under the data directory
    pub fn open_default() -> Result<Self> {
        Ok(Self {
            path: resolve_data_path()?.join("session.json"),
        })
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// The persisted session, if one exists and parses
    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path).map_err(ConfigError::ReadError)?;
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A corrupt session file just means signing in again
                debug!("discarding unreadable session file: {}", e);
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::ReadError)?;
        }
        let content = serde_json::to_string_pretty(session)
            .map_err(|e| ConfigError::MissingField(format!("session serialization: {}", e)))?;
        std::fs::write(&self.path, content).map_err(ConfigError::ReadError)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(ConfigError::ReadError)?;
        }
        Ok(())
    }
}
