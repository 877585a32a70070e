use std::fmt;

use crate::character::Character;
use crate::core::constants::COLLECTING_HINT;
use crate::core::splitter::Bubble;

/// Transient, non-transcript messages for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A completion attempt failed and retry `retry` is about to start.
    Retrying { retry: u32 },
    /// Input is being held by the delay buffer.
    Collecting { pending: usize },
    /// The transcript of the open character was emptied.
    Cleared,
    /// A persistence write failed; the in-memory state is still current.
    PersistFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Retrying { retry } => write!(f, "API请求失败，正在进行第{retry}次重试..."),
            Notice::Collecting { .. } => f.write_str(COLLECTING_HINT),
            Notice::Cleared => f.write_str("Chat history cleared"),
            Notice::PersistFailed(err) => write!(f, "Failed to save chat history: {err}"),
        }
    }
}

/// Where the pipeline shows things. Implementations must not block.
pub trait ChatSurface: Send + Sync {
    /// Show the whole transcript, already expanded into bubbles.
    fn render_transcript(&self, character: &Character, bubbles: &[Bubble]);

    /// Append one bubble that is not (yet) part of a rendered transcript.
    fn show_bubble(&self, character: &Character, bubble: &Bubble);

    fn show_typing(&self, character: &Character);

    fn hide_typing(&self);

    fn notice(&self, notice: &Notice);
}
