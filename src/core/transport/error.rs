use std::fmt;

use chrono::{DateTime, Utc};

/// One failed completion attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptError {
    /// 1-based attempt number.
    pub attempt: u32,
    /// HTTP status for non-2xx replies; `None` for transport or parse failures.
    pub status: Option<u16>,
    pub status_text: Option<String>,
    /// Raw error body, or the failure message.
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl AttemptError {
    pub fn http(attempt: u32, status: u16, status_text: String, body: String) -> Self {
        Self {
            attempt,
            status: Some(status),
            status_text: Some(status_text),
            detail: body,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(attempt: u32, message: impl Into<String>) -> Self {
        Self {
            attempt,
            status: None,
            status_text: None,
            detail: message.into(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "尝试 {}: [{}] {} - {}",
                self.attempt,
                status,
                self.status_text.as_deref().unwrap_or_default(),
                self.detail
            ),
            None => write!(f, "尝试 {}: {}", self.attempt, self.detail),
        }
    }
}

/// Every attempt of a completion call failed.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportError {
    pub max_retries: u32,
    /// One entry per attempt, in attempt order.
    pub attempts: Vec<AttemptError>,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API请求失败，已重试{}次。所有错误信息：",
            self.max_retries
        )?;
        for attempt in &self.attempts {
            write!(f, "\n{attempt}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Text of the transcript entry recorded for a failed turn.
    pub fn user_summary(&self) -> String {
        format!("抱歉，发生了错误：{self}")
    }
}
