// The gemini-memory crate keeps short conversational memory for the bot.
// It handles storing, retrieving, and bounding conversation turns.

pub mod adapters;
pub mod auth;
pub mod errors;
pub mod exchange;
pub mod key;
pub mod retention;
pub mod store;
pub mod turn;

pub use adapters::{FirebaseMemoryStore, InMemoryMemoryStore};
pub use errors::{MemoryResult, MemoryStoreError};
pub use exchange::append_exchange;
pub use key::{MemoryKey, MemoryScope};
pub use retention::RetentionPolicy;
pub use store::{MemorySnapshot, MemoryStore, MemoryStoreRef};
pub use turn::{turns_to_prompt_json, ConversationTurn, Role};
