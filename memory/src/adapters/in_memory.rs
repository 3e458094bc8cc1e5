use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::errors::{MemoryResult, MemoryStoreError};
use crate::key::MemoryKey;
use crate::store::{MemorySnapshot, MemoryStore};
use crate::turn::ConversationTurn;

#[derive(Debug, Default)]
struct Entry {
    turns: Vec<ConversationTurn>,
    version: u64,
}

/// In-memory implementation of MemoryStore
///
/// Every key carries a version counter starting at 0 for absent keys, so
/// conditional writes behave like the remote store's.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMemoryStore {
    /// Thread-safe storage of conversation threads
    entries: Arc<RwLock<HashMap<MemoryKey, Entry>>>,
}

impl InMemoryMemoryStore {
    /// Create a new InMemoryMemoryStore
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn load(&self, key: &MemoryKey) -> MemoryResult<MemorySnapshot> {
        let entries = self.entries.read().map_err(|e| {
            MemoryStoreError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let snapshot = match entries.get(key) {
            Some(entry) => MemorySnapshot {
                turns: entry.turns.clone(),
                revision: Some(entry.version.to_string()),
            },
            None => MemorySnapshot {
                turns: Vec::new(),
                revision: Some("0".to_string()),
            },
        };
        Ok(snapshot)
    }

    async fn save(
        &self,
        key: &MemoryKey,
        turns: &[ConversationTurn],
        expected_revision: Option<&str>,
    ) -> MemoryResult<()> {
        let mut entries = self.entries.write().map_err(|e| {
            MemoryStoreError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let entry = entries.entry(key.clone()).or_default();
        if let Some(expected) = expected_revision {
            if expected != entry.version.to_string() {
                return Err(MemoryStoreError::Conflict(key.to_string()));
            }
        }

        entry.turns = turns.to_vec();
        entry.version += 1;
        debug!(%key, version = entry.version, "Saved conversation memory");
        Ok(())
    }
}
