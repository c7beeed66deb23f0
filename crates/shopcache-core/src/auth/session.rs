use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::User;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Marker file written once a preload finished during this session
const PRELOAD_MARKER_FILE: &str = "preloaded";

/// Token expiry time in hours.
const TOKEN_EXPIRY_HOURS: i64 = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user: User,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(token: String, user: User, email: &str) -> Self {
        Self {
            token,
            user,
            email: email.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        let expiry = self.created_at + Duration::hours(TOKEN_EXPIRY_HOURS);
        Utc::now() > expiry
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        let expiry = self.created_at + Duration::hours(TOKEN_EXPIRY_HOURS);
        (expiry - Utc::now()).num_minutes().max(0)
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Expired sessions are treated as absent.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;

            if !data.is_expired() {
                self.data = Some(data);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data along with its preload marker
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        self.preload_marker().clear()?;
        Ok(())
    }

    /// Update session with new data. A new login starts without a preload marker.
    pub fn update(&mut self, data: SessionData) -> Result<()> {
        self.data = Some(data);
        self.preload_marker().clear()
    }

    /// Get the bearer token if session is valid
    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.token.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.data.as_ref().map(|d| &d.user)
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.data.as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    pub fn preload_marker(&self) -> PreloadMarker {
        PreloadMarker::at(self.cache_dir.join(PRELOAD_MARKER_FILE))
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

/// Advisory "already preloaded this session" flag.
///
/// The store sets it when a run completes and clears it on reset; it never
/// reads it. Callers check it before starting another preload.
#[derive(Debug)]
pub enum PreloadMarker {
    /// Lives only as long as this process
    Memory(AtomicBool),
    /// A file, so it survives a restart within the session
    File(PathBuf),
}

impl Default for PreloadMarker {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl PreloadMarker {
    pub fn in_memory() -> Self {
        PreloadMarker::Memory(AtomicBool::new(false))
    }

    pub fn at(path: PathBuf) -> Self {
        PreloadMarker::File(path)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            PreloadMarker::File(path) => Some(path),
            PreloadMarker::Memory(_) => None,
        }
    }

    pub fn is_set(&self) -> bool {
        match self {
            PreloadMarker::Memory(flag) => flag.load(Ordering::SeqCst),
            PreloadMarker::File(path) => path.exists(),
        }
    }

    pub fn set(&self) -> Result<()> {
        match self {
            PreloadMarker::Memory(flag) => flag.store(true, Ordering::SeqCst),
            PreloadMarker::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, Utc::now().to_rfc3339())
                    .context("Failed to write preload marker")?;
            }
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match self {
            PreloadMarker::Memory(flag) => flag.store(false, Ordering::SeqCst),
            PreloadMarker::File(path) => {
                if path.exists() {
                    std::fs::remove_file(path).context("Failed to remove preload marker")?;
                }
            }
        }
        Ok(())
    }
}
