//! Liunian is a terminal roleplay chat client for OpenAI-compatible APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns settings, persistence, the debug log, and the turn
//!   pipeline: delayed-send coalescing, completion with retries, and
//!   multi-message splitting.
//! - [`character`] manages the character roster and avatar handling.
//! - [`ui`] renders transcripts and paced replies on the terminal.
//! - [`api`] defines the chat and model payloads sent over the wire.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which parses arguments and dispatches into
//! the chat loop or one of the management commands.

pub mod api;
pub mod auth;
pub mod character;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
