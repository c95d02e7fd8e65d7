// src/engine/store.rs

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::session::SessionSnapshot;

/// Identifies one attempt session. The series id is part of the key so
/// concurrent sessions in different series never collide on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub series_id: i64,
    pub test_id: i64,
}

impl SessionKey {
    fn file_name(&self) -> String {
        format!("series-{}-test-{}.json", self.series_id, self.test_id)
    }
}

/// Durable key-value store for in-progress attempt snapshots, one JSON file
/// per session key under a local directory.
///
/// Failure semantics per the attempt flow's contract: every I/O or decode
/// problem is logged and degrades to a no-op (`save`/`clear`) or absent
/// (`load`). Losing resumability must never crash a running attempt.
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SessionStore { root: root.into() }
    }

    /// Writes the full snapshot, overwriting any prior entry for the key.
    /// Called after every session mutation.
    pub fn save(&self, key: SessionKey, snapshot: &SessionSnapshot) {
        if let Err(e) = self.try_save(key, snapshot) {
            tracing::warn!("Failed to persist session snapshot {:?}: {}", key, e);
        }
    }

    fn try_save(&self, key: SessionKey, snapshot: &SessionSnapshot) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let body = serde_json::to_vec(snapshot)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(self.root.join(key.file_name()), body)
    }

    /// Returns the stored snapshot for the key, or `None` when there is no
    /// entry or the entry cannot be read or decoded. A corrupt file is
    /// treated exactly like a missing one.
    pub fn load(&self, key: SessionKey) -> Option<SessionSnapshot> {
        let path = self.root.join(key.file_name());
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read session snapshot {:?}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&body) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Discarding undecodable session snapshot {:?}: {}", key, e);
                None
            }
        }
    }

    /// Removes the entry for the key. Missing entries are fine.
    pub fn clear(&self, key: SessionKey) {
        match fs::remove_file(self.root.join(key.file_name())) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to clear session snapshot {:?}: {}", key, e),
        }
    }
}
