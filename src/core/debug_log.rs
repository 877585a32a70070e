//! Persisted, bounded log of pipeline events.
//!
//! This is the user-facing debug log (request/response echoes, per-attempt
//! failures, settings changes). It is separate from `tracing` diagnostics: it
//! is only recorded while enabled, survives restarts, and can be exported.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration as ChronoDuration, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::core::constants::MAX_DEBUG_LOG_ENTRIES;
use crate::core::store::{read_json, write_json, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugEventKind {
    ApiRequest,
    ApiResponse,
    ApiError,
    SettingsChange,
}

impl DebugEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DebugEventKind::ApiRequest => "api_request",
            DebugEventKind::ApiResponse => "api_response",
            DebugEventKind::ApiError => "api_error",
            DebugEventKind::SettingsChange => "settings_change",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugLogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: DebugEventKind,
    pub data: Value,
}

struct RecorderState {
    enabled: bool,
    entries: Vec<DebugLogEntry>,
}

/// Cloneable handle to the shared debug log.
#[derive(Clone)]
pub struct DebugRecorder {
    state: Arc<Mutex<RecorderState>>,
    sink: Option<PathBuf>,
    capacity: usize,
}

impl DebugRecorder {
    /// In-memory recorder with no backing file.
    pub fn in_memory(enabled: bool) -> Self {
        Self::with_entries(enabled, Vec::new(), None)
    }

    /// Load the persisted log from `path`, dropping entries older than
    /// `retention_days`. The pruned log is written back when anything was dropped.
    pub fn load(path: PathBuf, enabled: bool, retention_days: u32) -> Result<Self, StoreError> {
        let mut entries: Vec<DebugLogEntry> = read_json(&path)?;
        let original = entries.len();
        if enabled {
            let cutoff = Utc::now() - ChronoDuration::days(i64::from(retention_days));
            entries.retain(|entry| entry.timestamp >= cutoff);
        }
        let recorder = Self::with_entries(enabled, entries, Some(path));
        if recorder.len() != original {
            recorder.persist();
        }
        Ok(recorder)
    }

    fn with_entries(enabled: bool, entries: Vec<DebugLogEntry>, sink: Option<PathBuf>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RecorderState { enabled, entries })),
            sink,
            capacity: MAX_DEBUG_LOG_ENTRIES,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.lock().enabled = enabled;
    }

    /// Append an event when recording is enabled; a no-op otherwise.
    pub fn record(&self, kind: DebugEventKind, data: Value) {
        {
            let mut state = self.lock();
            if !state.enabled {
                return;
            }
            state.entries.push(DebugLogEntry {
                timestamp: Utc::now(),
                kind,
                data,
            });
            let overflow = state.entries.len().saturating_sub(self.capacity);
            if overflow > 0 {
                state.entries.drain(..overflow);
            }
        }
        self.persist();
    }

    pub fn entries(&self) -> Vec<DebugLogEntry> {
        self.lock().entries.clone()
    }

    pub fn count(&self, kind: DebugEventKind) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, including the persisted copy, whether or not
    /// recording is enabled.
    pub fn clear(&self) {
        self.lock().entries.clear();
        if let Some(path) = &self.sink {
            if let Err(err) = write_json(path, &Vec::<DebugLogEntry>::new()) {
                warn!(error = %err, "failed to clear debug log");
            }
        }
    }

    /// Approximate serialized size, e.g. `1.50 KB, 12 entries`.
    pub fn size_summary(&self) -> String {
        let state = self.lock();
        if state.entries.is_empty() {
            return "no log data".to_string();
        }
        let bytes = serde_json::to_string(&state.entries)
            .map(|json| json.len())
            .unwrap_or_default();
        let size = if bytes < 1024 {
            format!("{bytes} bytes")
        } else if bytes < 1024 * 1024 {
            format!("{:.2} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
        };
        format!("{size}, {} entries", state.entries.len())
    }

    /// Render the log as a human-readable text dump.
    pub fn export_text(&self) -> String {
        let state = self.lock();
        let mut out = String::new();
        let _ = writeln!(out, "Debug log export");
        let _ = writeln!(out, "Exported at: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Entries: {}", state.entries.len());
        let _ = writeln!(out, "{}\n", "=".repeat(80));

        for entry in &state.entries {
            let local = entry.timestamp.with_timezone(&Local);
            let _ = writeln!(
                out,
                "[{}] {}",
                local.format("%Y-%m-%d %H:%M:%S"),
                entry.kind.as_str().to_uppercase()
            );
            match &entry.data {
                Value::String(text) => out.push_str(text),
                other => out.push_str(
                    &serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
                ),
            }
            let _ = writeln!(out, "\n{}\n", "-".repeat(40));
        }
        out
    }

    fn persist(&self) {
        let Some(path) = &self.sink else {
            return;
        };
        let entries = {
            let state = self.lock();
            if !state.enabled {
                return;
            }
            state.entries.clone()
        };
        if let Err(err) = write_json(path, &entries) {
            warn!(error = %err, "failed to persist debug log");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Preview of a response body: the first `limit` characters, with `...`
/// appended when anything was cut.
pub fn preview(text: &str, limit: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
