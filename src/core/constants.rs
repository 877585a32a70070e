//! Shared constants used across the delivery pipeline

use std::time::Duration;

/// Retries after the first attempt; a turn makes at most `MAX_RETRIES + 1` calls.
pub const MAX_RETRIES: u32 = 3;

/// Backoff unit. The sleep before retry `n` is `n * RETRY_BACKOFF_UNIT`.
pub const RETRY_BACKOFF_UNIT: Duration = Duration::from_millis(1000);

/// Longest accepted delay-send window.
pub const MAX_REPLY_DELAY: Duration = Duration::from_secs(86_400);

/// Pause between consecutive bubbles of a multi-message reply.
pub const MULTI_MESSAGE_PACING: Duration = Duration::from_millis(1500);

/// Temperature sent on the wire. The user-facing temperature setting is not forwarded.
pub const WIRE_TEMPERATURE: f32 = 0.7;

/// Characters kept in the debug-log response preview.
pub const RESPONSE_PREVIEW_CHARS: usize = 200;

pub const MAX_DEBUG_LOG_ENTRIES: usize = 1000;

/// Persona used when a character has none.
pub const DEFAULT_PERSONA: &str = "你是一个友好的AI助手";

/// Placeholder shown while waiting for a reply.
pub const TYPING_PLACEHOLDER: &str = "正在输入...";

/// Hint shown while user input is being collected for a delayed send.
pub const COLLECTING_HINT: &str = "正在收集消息...";
