use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::MemoryResult;
use crate::key::MemoryKey;
use crate::turn::ConversationTurn;

/// The turns stored under one key, together with the revision they were read at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySnapshot {
    pub turns: Vec<ConversationTurn>,
    /// Opaque version tag; `None` when the backend did not report one
    pub revision: Option<String>,
}

/// Trait defining the interface for conversation memory backends
#[async_trait]
pub trait MemoryStore: Send + Sync + Debug {
    /// Read all turns under `key`. An absent key yields an empty snapshot.
    async fn load(&self, key: &MemoryKey) -> MemoryResult<MemorySnapshot>;

    /// Replace the turns under `key`.
    ///
    /// With `expected_revision` set, the write only succeeds if the stored
    /// value is still at that revision, otherwise `MemoryStoreError::Conflict`.
    async fn save(
        &self,
        key: &MemoryKey,
        turns: &[ConversationTurn],
        expected_revision: Option<&str>,
    ) -> MemoryResult<()>;
}

/// Type alias for Arc-wrapped MemoryStore trait objects
pub type MemoryStoreRef = Arc<dyn MemoryStore>;
