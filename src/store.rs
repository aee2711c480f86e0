//! Durable persistence of the last-applied filters and platform.
//!
//! Read on controller init, written on every filter application, so a
//! restart restores the previous view. Persistence failures are swallowed:
//! losing the saved session is never worth failing an operation.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::filter::FilterState;
use crate::types::Platform;

/// What survives a restart
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub platform: Option<Platform>,
    #[serde(default)]
    pub filters: FilterState,
}

pub trait SessionStore: Send {
    fn load(&self) -> Option<PersistedSession>;
    fn save(&self, session: &PersistedSession);
}

/// JSON file under the user's home directory
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".logscope").join("session.json"))
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self) -> Option<PersistedSession> {
        let content = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn save(&self, session: &PersistedSession) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(content) = serde_json::to_string_pretty(session) {
            let _ = fs::write(&self.path, content);
        }
    }
}

/// In-memory store for tests and embedders without a filesystem
#[derive(Default)]
pub struct MemoryStore {
    session: Mutex<Option<PersistedSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Option<PersistedSession> {
        self.session.lock().ok()?.clone()
    }

    fn save(&self, session: &PersistedSession) {
        if let Ok(mut slot) = self.session.lock() {
            *slot = Some(session.clone());
        }
    }
}
