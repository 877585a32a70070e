//! Terminal presentation for chat sessions.
//!
//! [`console`] implements [`crate::core::turn::ChatSurface`] on top of a plain
//! line-oriented terminal; the chat loop itself lives in [`crate::cli::chat`].

pub mod console;
