//! Prompt construction for the reply flows.

use gemini_core::types::{Content, Part};
use gemini_memory::turn::{turns_to_prompt_json, ConversationTurn};

use crate::config::HistoryMode;

pub const DEFAULT_IMAGE_PROMPT: &str = "Describe this image with scientific detail, reply in zh-TW:";
pub const IMAGE_MIME_TYPE: &str = "image/png";

/// Contents for a text reply given the stored history and the new message.
///
/// `Prompt` folds the history into a single user text of the form
/// `Memory:(<history json>), <message>`; `Structured` sends the history as
/// alternating turns followed by the new message.
pub fn text_contents(mode: HistoryMode, history: &[ConversationTurn], user_text: &str) -> Vec<Content> {
    match mode {
        HistoryMode::Prompt => vec![Content::user_text(folded_prompt(history, user_text))],
        HistoryMode::Structured => history
            .iter()
            .map(ConversationTurn::to_content)
            .chain(std::iter::once(Content::user_text(user_text)))
            .collect(),
    }
}

pub fn folded_prompt(history: &[ConversationTurn], user_text: &str) -> String {
    format!("Memory:({}), {}", turns_to_prompt_json(history), user_text)
}

/// Contents for describing an image: the image first, then the instruction.
pub fn image_contents(image: &[u8], instruction: &str) -> Vec<Content> {
    vec![Content::user_parts(vec![
        Part::inline_data(IMAGE_MIME_TYPE, image),
        Part::text(instruction),
    ])]
}
