//! Text setting handlers.

use serde_json::Value;

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mask_secret, truncate_with_ellipsis};
use crate::cli::settings::SettingHandler;
use crate::core::config::Settings;

/// Data-driven handler for free-text settings. Multi-word values are joined
/// with spaces.
pub struct TextHandler {
    key: &'static str,
    category: &'static str,
    hint: &'static str,
    example: &'static str,
    /// Masked in listings and in the debug log.
    secret: bool,
    get: fn(&Settings) -> &str,
    set_field: fn(&mut Settings, String),
}

impl SettingHandler for TextHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn category(&self) -> &'static str {
        self.category
    }

    fn set(&self, args: &[String], settings: &mut Settings) -> Result<(), SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }
        (self.set_field)(settings, args.join(" "));
        Ok(())
    }

    fn reset(&self, settings: &mut Settings) {
        let default = Settings::default();
        (self.set_field)(settings, (self.get)(&default).to_string());
    }

    fn display(&self, settings: &Settings) -> String {
        let value = (self.get)(settings);
        if self.secret {
            mask_secret(value)
        } else {
            truncate_with_ellipsis(&value.replace('\n', " "), 50)
        }
    }

    fn value(&self, settings: &Settings) -> Value {
        let value = (self.get)(settings);
        if self.secret {
            Value::String(mask_secret(value))
        } else {
            Value::String(value.to_string())
        }
    }
}

pub fn api_url_handler() -> TextHandler {
    TextHandler {
        key: "api-url",
        category: "api",
        hint: "To set the chat-completions endpoint, provide its full URL:",
        example: "liunian set api-url https://api.openai.com/v1/chat/completions",
        secret: false,
        get: |s| s.api_url.as_str(),
        set_field: |s, v| s.api_url = v,
    }
}

pub fn api_key_handler() -> TextHandler {
    TextHandler {
        key: "api-key",
        category: "api",
        hint: "To store an API key in the config file, provide it (or use 'liunian auth'):",
        example: "liunian set api-key sk-...",
        secret: true,
        get: |s| s.api_key.as_str(),
        set_field: |s, v| s.api_key = v,
    }
}

pub fn model_handler() -> TextHandler {
    TextHandler {
        key: "model",
        category: "api",
        hint: "To set the model, provide its id (see 'liunian models'):",
        example: "liunian set model gpt-4o-mini",
        secret: false,
        get: |s| s.model.as_str(),
        set_field: |s, v| s.model = v,
    }
}

pub fn role_play_prompt_handler() -> TextHandler {
    TextHandler {
        key: "role-play-prompt",
        category: "chat",
        hint: "To set the role-play preamble, provide the text:",
        example: "liunian set role-play-prompt \"Stay in character at all times:\"",
        secret: false,
        get: |s| s.role_play_prompt.as_str(),
        set_field: |s, v| s.role_play_prompt = v,
    }
}

pub fn separator_handler() -> TextHandler {
    TextHandler {
        key: "separator",
        category: "chat",
        hint: "To set the multi-message separator, provide the literal token:",
        example: "liunian set separator ||",
        secret: false,
        get: |s| s.multi_message_separator.as_str(),
        set_field: |s, v| s.multi_message_separator = v,
    }
}
