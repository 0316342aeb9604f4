use super::json_store::{JsonStore, Storable};
use super::PersistenceError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything kept about a session between requests: its position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub session_id: String,
    pub fen: String,
    pub updated_at: u64,
}

impl Storable for StoredSession {
    fn id(&self) -> &str {
        &self.session_id
    }
}

/// Persistence layer for live sessions. Uses JSON files in a directory.
pub struct SessionStore {
    inner: JsonStore<StoredSession>,
}

impl SessionStore {
    /// Create a new SessionStore with the given data directory.
    pub fn new(data_dir: PathBuf) -> Self {
        let dir = data_dir.join("sessions");
        Self {
            inner: JsonStore::new(dir),
        }
    }

    pub fn save(&self, data: &StoredSession) -> Result<String, PersistenceError> {
        self.inner.save(data)
    }

    /// Load a session by id. A file that exists but cannot be decoded is an
    /// error, not `None`.
    pub fn load(&self, id: &str) -> Result<Option<StoredSession>, PersistenceError> {
        self.inner.load(id)
    }

    pub fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        self.inner.delete(id)
    }
}

#[cfg(test)]
impl SessionStore {
    /// Write raw bytes where a session record would live.
    pub(crate) fn write_raw(&self, id: &str, contents: &str) {
        self.inner.ensure_dir().unwrap();
        std::fs::write(self.inner.file_path(id), contents).unwrap();
    }
}
