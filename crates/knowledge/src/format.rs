//! Rendering of retrieved chunks and conversation history into prompt text.

use crate::types::{Chunk, Message};

/// Join chunk texts with a blank line between them.
pub fn format_chunks(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render each message as `ROLE: content`, one per line.
pub fn format_history(history: &[Message]) -> String {
    history
        .iter()
        .map(|message| format!("{}: {}", message.role.label(), message.content))
        .collect::<Vec<_>>()
        .join("\n")
}
