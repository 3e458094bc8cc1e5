//! Storage backends for conversation memory.

pub mod firebase;
pub mod in_memory;

pub use firebase::FirebaseMemoryStore;
pub use in_memory::InMemoryMemoryStore;
