//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::{
    api_key_handler, api_url_handler, context_count_handler, debug_log_handler,
    delay_hint_handler, delay_send_handler, log_retention_handler, model_handler,
    multi_message_handler, reply_delay_handler, role_play_handler, role_play_prompt_handler,
    separator_handler, temperature_handler, top_p_handler,
};
use super::SettingHandler;

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for `liunian set` output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        // Register handlers in display order
        registry.register(Box::new(api_url_handler()));
        registry.register(Box::new(api_key_handler()));
        registry.register(Box::new(model_handler()));
        registry.register(Box::new(temperature_handler()));
        registry.register(Box::new(top_p_handler()));
        registry.register(Box::new(context_count_handler()));
        registry.register(Box::new(role_play_handler()));
        registry.register(Box::new(role_play_prompt_handler()));
        registry.register(Box::new(delay_send_handler()));
        registry.register(Box::new(reply_delay_handler()));
        registry.register(Box::new(delay_hint_handler()));
        registry.register(Box::new(multi_message_handler()));
        registry.register(Box::new(separator_handler()));
        registry.register(Box::new(debug_log_handler()));
        registry.register(Box::new(log_retention_handler()));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    /// Get a handler by key.
    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        self.handlers.get(key).map(|h| h.as_ref())
    }

    /// Get all keys in display order.
    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
