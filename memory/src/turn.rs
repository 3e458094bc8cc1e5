use gemini_core::types::{Content, Part};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of the stored two-party conversation.
///
/// Older records were written with capitalised `Parts`/`Role` keys, both spellings are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(alias = "Parts", default)]
    pub parts: Vec<String>,
    #[serde(alias = "Role")]
    pub role: Role,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            parts: vec![text.into()],
            role: Role::User,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            parts: vec![text.into()],
            role: Role::Model,
        }
    }

    /// Converts the turn into structured model history.
    pub fn to_content(&self) -> Content {
        Content {
            parts: self.parts.iter().map(|part| Part::text(part.clone())).collect(),
            role: Some(self.role.as_str().to_string()),
        }
    }
}

/// JSON rendering of the history that is folded into a text prompt.
pub fn turns_to_prompt_json(turns: &[ConversationTurn]) -> String {
    // Serializing plain strings and a unit enum cannot fail.
    serde_json::to_string(turns).unwrap_or_else(|_| "[]".to_string())
}
