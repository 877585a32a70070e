use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::constants::MAX_REPLY_DELAY;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_ROLE_PLAY_PROMPT: &str = "请你扮演一个角色，严格按照以下设定进行对话和回应：";
pub const DEFAULT_SEPARATOR: &str = "@@@@";

/// User settings consumed by the delivery pipeline.
///
/// Every field falls back to its own default when absent from the file, so a
/// partial `config.toml` is always valid input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Full chat-completions endpoint URL.
    pub api_url: String,
    /// Bearer token. Empty means "resolve from keyring or environment".
    pub api_key: String,
    pub model: String,
    /// Stored and displayed only; the wire temperature is fixed.
    pub temperature: f32,
    /// Stored and displayed only.
    pub top_p: f32,
    /// Number of transcript entries replayed upstream.
    pub context_count: usize,
    pub role_play_prompt: String,
    pub enable_role_play: bool,
    pub enable_delay_send: bool,
    /// Debounce window, in seconds.
    pub reply_delay: f64,
    pub show_delay_hint: bool,
    pub enable_multi_message: bool,
    pub multi_message_separator: String,
    pub enable_debug_log: bool,
    pub log_retention_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.8,
            top_p: 0.9,
            context_count: 20,
            role_play_prompt: DEFAULT_ROLE_PLAY_PROMPT.to_string(),
            enable_role_play: true,
            enable_delay_send: true,
            reply_delay: 15.0,
            show_delay_hint: true,
            enable_multi_message: true,
            multi_message_separator: DEFAULT_SEPARATOR.to_string(),
            enable_debug_log: false,
            log_retention_days: 7,
        }
    }
}

impl Settings {
    /// Replace blank text fields with their defaults, mirroring how the
    /// settings forms treat empty input.
    pub fn normalize(&mut self) {
        fn fill(field: &mut String, default: &str) {
            let trimmed = field.trim();
            if trimmed.is_empty() {
                *field = default.to_string();
            } else if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }

        fill(&mut self.api_url, DEFAULT_API_URL);
        fill(&mut self.model, DEFAULT_MODEL);
        fill(&mut self.role_play_prompt, DEFAULT_ROLE_PLAY_PROMPT);
        fill(&mut self.multi_message_separator, DEFAULT_SEPARATOR);
        self.api_key = self.api_key.trim().to_string();
    }

    /// Check numeric ranges. Returns the offending field and a reason.
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err((
                "temperature",
                format!("must be between 0 and 2, got {}", self.temperature),
            ));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err((
                "top_p",
                format!("must be between 0 and 1, got {}", self.top_p),
            ));
        }
        let max_delay = MAX_REPLY_DELAY.as_secs_f64();
        if !(0.0..=max_delay).contains(&self.reply_delay) {
            return Err((
                "reply_delay",
                format!(
                    "must be between 0 and {max_delay} seconds, got {}",
                    self.reply_delay
                ),
            ));
        }
        if self.log_retention_days == 0 {
            return Err(("log_retention_days", "must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The delay-send window, clamped to `0..=MAX_REPLY_DELAY`.
    pub fn reply_delay_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.reply_delay)
            .unwrap_or_default()
            .min(MAX_REPLY_DELAY)
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
