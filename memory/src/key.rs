use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MEMORY_ROOT: &str = "BwAI";

/// Thread for events that carry no conversation id under conversation scope.
/// Sits beside the per-conversation threads, never on the root holding them.
pub const UNSCOPED_SEGMENT: &str = "_unscoped";

/// How conversation memory is partitioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryScope {
    /// One thread shared by every chat, stored directly at the root key
    Global,
    /// One thread per user, group or room
    #[default]
    Conversation,
}

impl FromStr for MemoryScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(MemoryScope::Global),
            "conversation" | "per-conversation" => Ok(MemoryScope::Conversation),
            other => Err(format!("unknown memory scope: {}", other)),
        }
    }
}

/// Storage path of one conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryKey(String);

impl MemoryKey {
    /// Resolves the key for a conversation under `root`.
    ///
    /// Global scope maps to `root` itself. Under conversation scope a
    /// missing id maps to `{root}/_unscoped`.
    pub fn resolve(root: &str, scope: MemoryScope, conversation_id: Option<&str>) -> Self {
        let root = root.trim_matches('/');
        match (scope, conversation_id) {
            (MemoryScope::Global, _) => MemoryKey(root.to_string()),
            (MemoryScope::Conversation, Some(id)) if !id.is_empty() => {
                MemoryKey(format!("{}/{}", root, sanitize_segment(id)))
            }
            (MemoryScope::Conversation, _) => MemoryKey(format!("{}/{}", root, UNSCOPED_SEGMENT)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Realtime Database keys may not contain `.`, `#`, `$`, `[`, `]` or `/`.
fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '.' | '#' | '$' | '[' | ']' | '/' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
