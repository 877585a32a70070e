//! Boolean setting handlers for on/off settings.

use serde_json::Value;

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{format_bool, parse_bool};
use crate::cli::settings::SettingHandler;
use crate::core::config::Settings;

/// Data-driven handler for boolean (on/off) settings.
pub struct BooleanHandler {
    key: &'static str,
    category: &'static str,
    hint: &'static str,
    example: &'static str,
    get: fn(&Settings) -> bool,
    set_field: fn(&mut Settings, bool),
}

impl SettingHandler for BooleanHandler {
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

        let input = args.join(" ");
        let value = parse_bool(&input).ok_or(SettingError::InvalidBoolean(input))?;
        (self.set_field)(settings, value);
        Ok(())
    }

    fn reset(&self, settings: &mut Settings) {
        (self.set_field)(settings, (self.get)(&Settings::default()));
    }

    fn display(&self, settings: &Settings) -> String {
        format_bool((self.get)(settings)).to_string()
    }

    fn value(&self, settings: &Settings) -> Value {
        Value::Bool((self.get)(settings))
    }
}

pub fn role_play_handler() -> BooleanHandler {
    BooleanHandler {
        key: "role-play",
        category: "chat",
        hint: "To toggle the role-play preamble, specify on or off:",
        example: "liunian set role-play off",
        get: |s| s.enable_role_play,
        set_field: |s, v| s.enable_role_play = v,
    }
}

pub fn delay_send_handler() -> BooleanHandler {
    BooleanHandler {
        key: "delay-send",
        category: "chat",
        hint: "To toggle delayed sending, specify on or off:",
        example: "liunian set delay-send off",
        get: |s| s.enable_delay_send,
        set_field: |s, v| s.enable_delay_send = v,
    }
}

pub fn delay_hint_handler() -> BooleanHandler {
    BooleanHandler {
        key: "delay-hint",
        category: "chat",
        hint: "To toggle the collecting-messages hint, specify on or off:",
        example: "liunian set delay-hint off",
        get: |s| s.show_delay_hint,
        set_field: |s, v| s.show_delay_hint = v,
    }
}

pub fn multi_message_handler() -> BooleanHandler {
    BooleanHandler {
        key: "multi-message",
        category: "chat",
        hint: "To toggle multi-message replies, specify on or off:",
        example: "liunian set multi-message off",
        get: |s| s.enable_multi_message,
        set_field: |s, v| s.enable_multi_message = v,
    }
}

pub fn debug_log_handler() -> BooleanHandler {
    BooleanHandler {
        key: "debug-log",
        category: "debug",
        hint: "To toggle the debug log, specify on or off:",
        example: "liunian set debug-log on",
        get: |s| s.enable_debug_log,
        set_field: |s, v| s.enable_debug_log = v,
    }
}
