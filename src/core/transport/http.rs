use async_trait::async_trait;

use super::{CompletionEndpoint, EndpointReply};
use crate::api::ChatRequest;

/// Chat-completion endpoint reached over HTTP with a bearer token.
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpEndpoint {
    pub fn new(client: reqwest::Client, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl CompletionEndpoint for HttpEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, request: &ChatRequest) -> Result<EndpointReply, String> {
        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| err.to_string())?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response
            .text()
            .await
            .map_err(|err| format!("failed to read response body: {err}"))?;

        Ok(EndpointReply {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatMessage as ApiMessage;
    use crate::utils::test_utils::completion_body;
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, capture the raw request, answer with `status`.
    async fn serve_once(listener: TcpListener, status: &'static str, body: String) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8(raw).unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-test".into(),
            messages: vec![ApiMessage::new("user", "hi")],
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn posts_bearer_json_and_returns_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(listener, "200 OK", completion_body("hey")));

        let endpoint = HttpEndpoint::new(reqwest::Client::new(), url.clone(), "sk-test");
        assert_eq!(endpoint.url(), url);
        let reply = endpoint.post(&request()).await.unwrap();
        let raw = server.await.unwrap();

        assert_eq!(reply.status, 200);
        assert!(reply.is_success());
        assert_eq!(reply.body, completion_body("hey"));

        let lower = raw.to_ascii_lowercase();
        assert!(raw.starts_with("POST /v1/chat/completions HTTP/1.1"));
        assert!(lower.contains("authorization: bearer sk-test"));
        assert!(lower.contains("content-type: application/json"));

        let body = &raw[raw.find("\r\n\r\n").unwrap() + 4..];
        let json: Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["model"], "gpt-test");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!(json.get("top_p").is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_returned_not_raised() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/chat", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(
            listener,
            "503 Service Unavailable",
            "busy".to_string(),
        ));

        let reply = HttpEndpoint::new(reqwest::Client::new(), url, "k")
            .post(&request())
            .await
            .unwrap();
        server.await.unwrap();

        assert_eq!(reply.status, 503);
        assert_eq!(reply.status_text, "Service Unavailable");
        assert_eq!(reply.body, "busy");
        assert!(!reply.is_success());
    }

    #[tokio::test]
    async fn connection_failure_is_an_error_message() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/chat", listener.local_addr().unwrap());
        drop(listener);

        let err = HttpEndpoint::new(reqwest::Client::new(), url, "k")
            .post(&request())
            .await
            .unwrap_err();
        assert!(!err.is_empty());
    }
}
