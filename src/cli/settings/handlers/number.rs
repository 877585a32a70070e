//! Numeric setting handlers. Range checks live in `Settings::validate`.

use serde_json::Value;

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::round_display;
use crate::cli::settings::SettingHandler;
use crate::core::config::Settings;

pub struct NumberHandler {
    key: &'static str,
    category: &'static str,
    hint: &'static str,
    example: &'static str,
    /// Only non-negative whole numbers are accepted.
    integer: bool,
    get: fn(&Settings) -> f64,
    set_field: fn(&mut Settings, f64),
}

impl NumberHandler {
    fn parse(&self, input: &str) -> Option<f64> {
        let value = input.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
        if self.integer && (value < 0.0 || value.fract() != 0.0) {
            return None;
        }
        Some(value)
    }
}

impl SettingHandler for NumberHandler {
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
        let value = self.parse(&input).ok_or(SettingError::InvalidNumber {
            key: self.key,
            input,
            integer: self.integer,
        })?;
        (self.set_field)(settings, value);
        Ok(())
    }

    fn reset(&self, settings: &mut Settings) {
        (self.set_field)(settings, (self.get)(&Settings::default()));
    }

    fn display(&self, settings: &Settings) -> String {
        round_display((self.get)(settings)).to_string()
    }

    fn value(&self, settings: &Settings) -> Value {
        let value = round_display((self.get)(settings));
        if self.integer {
            Value::from(value as u64)
        } else {
            Value::from(value)
        }
    }
}

pub fn temperature_handler() -> NumberHandler {
    NumberHandler {
        key: "temperature",
        category: "api",
        hint: "To set the temperature, provide a value between 0 and 2:",
        example: "liunian set temperature 0.8",
        integer: false,
        get: |s| f64::from(s.temperature),
        set_field: |s, v| s.temperature = v as f32,
    }
}

pub fn top_p_handler() -> NumberHandler {
    NumberHandler {
        key: "top-p",
        category: "api",
        hint: "To set top-p, provide a value between 0 and 1:",
        example: "liunian set top-p 0.9",
        integer: false,
        get: |s| f64::from(s.top_p),
        set_field: |s, v| s.top_p = v as f32,
    }
}

pub fn context_count_handler() -> NumberHandler {
    NumberHandler {
        key: "context-count",
        category: "api",
        hint: "To set how many past messages are sent, provide a whole number:",
        example: "liunian set context-count 20",
        integer: true,
        get: |s| s.context_count as f64,
        set_field: |s, v| s.context_count = v as usize,
    }
}

pub fn reply_delay_handler() -> NumberHandler {
    NumberHandler {
        key: "reply-delay",
        category: "chat",
        hint: "To set the delayed-send window, provide a number of seconds:",
        example: "liunian set reply-delay 15",
        integer: false,
        get: |s| s.reply_delay,
        set_field: |s, v| s.reply_delay = v,
    }
}

pub fn log_retention_handler() -> NumberHandler {
    NumberHandler {
        key: "log-retention-days",
        category: "debug",
        hint: "To set how long debug log entries are kept, provide a number of days:",
        example: "liunian set log-retention-days 7",
        integer: true,
        get: |s| f64::from(s.log_retention_days),
        set_field: |s, v| s.log_retention_days = v as u32,
    }
}
