use tracing::{debug, warn};

use crate::errors::{MemoryResult, MemoryStoreError};
use crate::key::MemoryKey;
use crate::retention::RetentionPolicy;
use crate::store::{MemorySnapshot, MemoryStore};
use crate::turn::ConversationTurn;

/// Appends one user/model exchange to the history read in `snapshot` and
/// writes the whole sequence back.
///
/// The write is conditional on the snapshot's revision. When another writer
/// got there first, the key is re-read and the same exchange is appended to
/// the fresh history, at most `max_conflict_retries` more times. A snapshot
/// without a revision is written unconditionally.
///
/// Returns the sequence that was stored.
pub async fn append_exchange(
    store: &dyn MemoryStore,
    key: &MemoryKey,
    snapshot: MemorySnapshot,
    user_text: &str,
    reply_text: &str,
    policy: RetentionPolicy,
    max_conflict_retries: usize,
) -> MemoryResult<Vec<ConversationTurn>> {
    let mut snapshot = snapshot;
    let mut attempt = 0;

    loop {
        let mut turns = snapshot.turns;
        turns.push(ConversationTurn::user(user_text));
        turns.push(ConversationTurn::model(reply_text));
        policy.apply(&mut turns);

        match store.save(key, &turns, snapshot.revision.as_deref()).await {
            Ok(()) => {
                debug!(%key, turns = turns.len(), "Stored conversation memory");
                return Ok(turns);
            }
            Err(MemoryStoreError::Conflict(_)) if attempt < max_conflict_retries => {
                attempt += 1;
                warn!(%key, attempt, "Memory changed concurrently, re-reading before retry");
                snapshot = store.load(key).await?;
            }
            Err(e) => return Err(e),
        }
    }
}
