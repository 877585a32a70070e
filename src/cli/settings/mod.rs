//! Settings management for CLI set/unset commands.
//!
//! Each key is served by a data-driven handler:
//!
//! - Boolean settings (e.g., `delay-send`, `multi-message`)
//! - Text settings (e.g., `model`, `separator`)
//! - Number settings (e.g., `reply-delay`, `temperature`)
//!
//! Every accepted change is normalized, validated, written to the config file
//! and recorded in the debug log as a `settings_change` event.

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

use std::path::Path;

use serde_json::{json, Value};
use tracing::info;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::Settings;
use crate::core::debug_log::{DebugEventKind, DebugRecorder};

/// Context provided to set/unset operations.
pub struct SetContext<'a> {
    pub settings: &'a mut Settings,
    pub config_path: &'a Path,
    pub recorder: &'a DebugRecorder,
}

/// Trait for handling a configuration setting.
///
/// Handlers only touch their own field; persistence, validation and change
/// recording happen once in [`set_value`] and [`unset_value`].
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Group name recorded with change events.
    fn category(&self) -> &'static str;

    /// Parse `args` and write the new value into `settings`.
    fn set(&self, args: &[String], settings: &mut Settings) -> Result<(), SettingError>;

    /// Restore the field's default.
    fn reset(&self, settings: &mut Settings);

    /// Current value formatted for the terminal.
    fn display(&self, settings: &Settings) -> String;

    /// Current value as recorded in the debug log.
    fn value(&self, settings: &Settings) -> Value;

    /// Format the current value for display in `liunian set` output.
    fn format(&self, settings: &Settings) -> String {
        format!("  {}: {}", self.key(), self.display(settings))
    }
}

pub fn set_value(
    registry: &SettingRegistry,
    key: &str,
    args: &[String],
    ctx: &mut SetContext<'_>,
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;

    let mut next = ctx.settings.clone();
    handler.set(args, &mut next)?;
    commit(handler, next, ctx)?;
    Ok(format!(
        "✅ Set {} to: {}",
        handler.key(),
        handler.display(ctx.settings)
    ))
}

pub fn unset_value(
    registry: &SettingRegistry,
    key: &str,
    ctx: &mut SetContext<'_>,
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;

    let mut next = ctx.settings.clone();
    handler.reset(&mut next);
    commit(handler, next, ctx)?;
    Ok(format!(
        "✅ Unset {} (will use default: {})",
        handler.key(),
        handler.display(ctx.settings)
    ))
}

/// All settings, one per line, in registry order.
pub fn format_all(registry: &SettingRegistry, settings: &Settings) -> String {
    registry
        .keys_display_order()
        .iter()
        .filter_map(|key| registry.get(key))
        .map(|handler| handler.format(settings))
        .collect::<Vec<_>>()
        .join("\n")
}

fn commit(
    handler: &dyn SettingHandler,
    mut next: Settings,
    ctx: &mut SetContext<'_>,
) -> Result<(), SettingError> {
    next.normalize();
    next.validate()
        .map_err(|(_, reason)| SettingError::InvalidValue {
            key: handler.key(),
            reason,
        })?;
    next.save_to_path(ctx.config_path)
        .map_err(|err| SettingError::ConfigError(err.to_string()))?;

    let old = handler.value(ctx.settings);
    let new = handler.value(&next);
    *ctx.settings = next;
    info!(key = handler.key(), "setting updated");

    ctx.recorder.set_enabled(ctx.settings.enable_debug_log);
    if old != new {
        let mut changes = serde_json::Map::new();
        changes.insert(handler.key().to_string(), json!({ "old": old, "new": new }));
        ctx.recorder.record(
            DebugEventKind::SettingsChange,
            json!({ "category": handler.category(), "changes": changes }),
        );
    }
    Ok(())
}
