//! The logged-in user, remembered between CLI invocations.
use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{read_json_file, write_json_atomic, PrepaseError, Result};

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub logged_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            logged_in_at: Utc::now(),
        }
    }

    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(SESSION_FILE)
    }

    /// The stored session, if any
    pub fn load(data_dir: &Path) -> Result<Option<Session>> {
        let path = Self::path(data_dir);
        if !path.exists() {
            debug!("No session at {}", path.display());
            return Ok(None);
        }
        read_json_file(&path).map(Some)
    }

    /// The stored session or [`PrepaseError::NotLoggedIn`]
    pub fn require(data_dir: &Path) -> Result<Session> {
        Self::load(data_dir)?.ok_or(PrepaseError::NotLoggedIn)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        write_json_atomic(&Self::path(data_dir), self)?;
        info!("Session saved for {}", self.username);
        Ok(())
    }

    /// Removes the stored session, returning whether there was one
    pub fn clear(data_dir: &Path) -> Result<bool> {
        let path = Self::path(data_dir);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        info!("Session cleared");
        Ok(true)
    }
}
