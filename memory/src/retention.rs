use crate::turn::{ConversationTurn, Role};

pub const DEFAULT_MAX_TURNS: usize = 20;

/// Bounds how much history is kept per conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum number of turns kept; 0 keeps everything
    pub max_turns: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

impl RetentionPolicy {
    pub fn unbounded() -> Self {
        Self { max_turns: 0 }
    }

    /// Keeps the most recent `max_turns` turns, then drops leading model
    /// turns so the retained history always opens with the user.
    pub fn apply(&self, turns: &mut Vec<ConversationTurn>) {
        if self.max_turns == 0 || turns.len() <= self.max_turns {
            return;
        }

        let excess = turns.len() - self.max_turns;
        turns.drain(..excess);

        let leading_model = turns
            .iter()
            .take_while(|turn| turn.role == Role::Model)
            .count();
        turns.drain(..leading_model);
    }
}
