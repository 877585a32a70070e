//! Completion calls with bounded retry and per-attempt error aggregation.

pub mod error;
pub mod http;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::{ChatCompletion, ChatMessage as ApiMessage, ChatRequest};
use crate::core::constants::{
    MAX_RETRIES, RESPONSE_PREVIEW_CHARS, RETRY_BACKOFF_UNIT, WIRE_TEMPERATURE,
};
use crate::core::debug_log::{preview, DebugEventKind, DebugRecorder};

pub use error::{AttemptError, TransportError};
pub use http::HttpEndpoint;

/// Raw reply from one POST, before any interpretation.
#[derive(Debug, Clone)]
pub struct EndpointReply {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl EndpointReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one completion request. `Err` carries a transport-level failure
/// message such as a refused connection.
#[async_trait]
pub trait CompletionEndpoint: Send + Sync {
    fn url(&self) -> &str;

    async fn post(&self, request: &ChatRequest) -> Result<EndpointReply, String>;
}

pub struct Transport {
    endpoint: Arc<dyn CompletionEndpoint>,
    recorder: DebugRecorder,
    max_retries: u32,
    backoff_unit: Duration,
}

impl Transport {
    pub fn new(endpoint: Arc<dyn CompletionEndpoint>, recorder: DebugRecorder) -> Self {
        Self {
            endpoint,
            recorder,
            max_retries: MAX_RETRIES,
            backoff_unit: RETRY_BACKOFF_UNIT,
        }
    }

    /// Request a completion, retrying up to `MAX_RETRIES` times with linear
    /// backoff. `on_retry` is called with the retry number (1-based) before
    /// each retry's backoff sleep.
    pub async fn complete(
        &self,
        model: &str,
        messages: Vec<ApiMessage>,
        on_retry: &(dyn Fn(u32) + Send + Sync),
    ) -> Result<String, TransportError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages,
            temperature: WIRE_TEMPERATURE,
        };

        self.recorder.record(
            DebugEventKind::ApiRequest,
            json!({
                "url": self.endpoint.url(),
                "model": request.model,
                "messageCount": request.messages.len(),
                "requestData": request,
            }),
        );

        let mut failures: Vec<AttemptError> = Vec::new();
        for retry in 0..=self.max_retries {
            let attempt = retry + 1;
            if retry > 0 {
                on_retry(retry);
                tokio::time::sleep(self.backoff_unit * retry).await;
            }

            debug!(attempt, model, "sending completion request");
            let failure = match self.endpoint.post(&request).await {
                Ok(reply) if reply.is_success() => match parse_completion(&reply.body) {
                    Ok((content, completion)) => {
                        self.recorder.record(
                            DebugEventKind::ApiResponse,
                            json!({
                                "model": completion.model,
                                "usage": completion.usage,
                                "responsePreview": preview(&content, RESPONSE_PREVIEW_CHARS),
                                "fullResponse": content,
                                "attempt": attempt,
                            }),
                        );
                        info!(attempt, chars = content.chars().count(), "completion received");
                        return Ok(content);
                    }
                    Err(message) => AttemptError::failure(attempt, message),
                },
                Ok(reply) => AttemptError::http(attempt, reply.status, reply.status_text, reply.body),
                Err(message) => AttemptError::failure(attempt, message),
            };

            warn!(attempt, status = ?failure.status, detail = %failure.detail, "completion attempt failed");
            self.recorder.record(
                DebugEventKind::ApiError,
                json!({
                    "attempt": attempt,
                    "status": failure.status,
                    "statusText": failure.status_text,
                    "error": failure.detail,
                }),
            );
            failures.push(failure);
        }

        Err(TransportError {
            max_retries: self.max_retries,
            attempts: failures,
        })
    }
}

/// Extract the first choice's content. Any shape mismatch is a failure of
/// the attempt, same as a dropped connection.
fn parse_completion(body: &str) -> Result<(String, ChatCompletion), String> {
    let mut completion: ChatCompletion =
        serde_json::from_str(body).map_err(|err| format!("invalid response body: {err}"))?;
    let content = completion
        .choices
        .first_mut()
        .and_then(|choice| choice.message.content.take())
        .ok_or_else(|| "response contained no message content".to_string())?;
    Ok((content, completion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{completion_body, ScriptedEndpoint};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn transport(endpoint: Arc<ScriptedEndpoint>, recorder: &DebugRecorder) -> Transport {
        Transport::new(endpoint, recorder.clone())
    }

    fn messages() -> Vec<ApiMessage> {
        vec![
            ApiMessage::new("system", "be nice"),
            ApiMessage::new("user", "hi"),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_returns_content_without_retry() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![Ok(EndpointReply {
            status: 200,
            status_text: "OK".into(),
            body: completion_body("hello"),
        })]));
        let recorder = DebugRecorder::in_memory(true);

        let content = transport(endpoint.clone(), &recorder)
            .complete("m", messages(), &|_| panic!("no retry expected"))
            .await
            .unwrap();

        assert_eq!(content, "hello");
        assert_eq!(endpoint.calls(), 1);
        let request = &endpoint.requests()[0];
        assert_eq!(request.temperature, WIRE_TEMPERATURE);
        assert_eq!(request.model, "m");
        assert_eq!(recorder.count(DebugEventKind::ApiRequest), 1);
        assert_eq!(recorder.count(DebugEventKind::ApiResponse), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_fourth_attempt_after_linear_backoff() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![
            Ok(EndpointReply {
                status: 500,
                status_text: "Internal Server Error".into(),
                body: "boom".into(),
            }),
            Err("connection reset".into()),
            Ok(EndpointReply {
                status: 200,
                status_text: "OK".into(),
                body: "not json".into(),
            }),
            Ok(EndpointReply {
                status: 200,
                status_text: "OK".into(),
                body: completion_body("finally"),
            }),
        ]));
        let recorder = DebugRecorder::in_memory(true);
        let retries = Mutex::new(Vec::new());
        let start = Instant::now();

        let content = transport(endpoint.clone(), &recorder)
            .complete("m", messages(), &|n| retries.lock().unwrap().push(n))
            .await
            .unwrap();

        assert_eq!(content, "finally");
        assert_eq!(*retries.lock().unwrap(), vec![1, 2, 3]);
        let offsets: Vec<_> = endpoint
            .call_times()
            .iter()
            .map(|t| t.duration_since(start).as_millis())
            .collect();
        assert_eq!(offsets, vec![0, 1000, 3000, 6000]);
        assert_eq!(recorder.count(DebugEventKind::ApiError), 3);
        assert_eq!(recorder.count(DebugEventKind::ApiResponse), 1);

        let response = recorder
            .entries()
            .into_iter()
            .find(|e| e.kind == DebugEventKind::ApiResponse)
            .unwrap();
        assert_eq!(response.data["attempt"], 4);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_aggregates_all_four_attempts_in_order() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![
            Ok(EndpointReply {
                status: 429,
                status_text: "Too Many Requests".into(),
                body: "slow down".into(),
            }),
            Err("dns error".into()),
            Ok(EndpointReply {
                status: 502,
                status_text: "Bad Gateway".into(),
                body: "<html>".into(),
            }),
            Err("timed out".into()),
        ]));
        let recorder = DebugRecorder::in_memory(true);

        let err = transport(endpoint.clone(), &recorder)
            .complete("m", messages(), &|_| {})
            .await
            .unwrap_err();

        assert_eq!(endpoint.calls(), 4);
        assert_eq!(err.attempts.len(), 4);
        assert_eq!(err.attempts[0].status, Some(429));
        assert_eq!(err.attempts[1].status, None);

        let text = err.to_string();
        let positions: Vec<_> = (1..=4)
            .map(|n| text.find(&format!("尝试 {n}:")).expect("attempt entry present"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("尝试 1: [429] Too Many Requests - slow down"));
        assert!(text.contains("尝试 4: timed out"));
        assert_eq!(recorder.count(DebugEventKind::ApiError), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_content_counts_as_failed_attempt() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![Ok(EndpointReply {
            status: 200,
            status_text: "OK".into(),
            body: r#"{"choices":[]}"#.into(),
        })]));
        let recorder = DebugRecorder::in_memory(false);

        let err = transport(endpoint, &recorder)
            .complete("m", messages(), &|_| {})
            .await
            .unwrap_err();

        assert!(err.attempts[0]
            .detail
            .contains("response contained no message content"));
        assert!(recorder.is_empty(), "disabled recorder stays empty");
    }

    #[test]
    fn parse_completion_reads_first_choice() {
        let (content, completion) = parse_completion(
            r#"{"choices":[{"message":{"content":"a"}},{"message":{"content":"b"}}],"model":"gpt","usage":{"total_tokens":3}}"#,
        )
        .unwrap();
        assert_eq!(content, "a");
        assert_eq!(completion.model.as_deref(), Some("gpt"));
        assert_eq!(completion.usage.unwrap()["total_tokens"], 3);
    }
}
