use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;

use crate::api::ChatRequest;
use crate::character::Character;
use crate::core::config::Settings;
use crate::core::context::{AppContext, SharedContext};
use crate::core::debug_log::DebugRecorder;
use crate::core::message::Transcripts;
use crate::core::splitter::Bubble;
use crate::core::store::DataStore;
use crate::core::transport::{CompletionEndpoint, EndpointReply, Transport};
use crate::core::turn::{ChatSurface, Notice};

/// Body of a successful completion carrying `content`.
pub fn completion_body(content: &str) -> String {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "model": "test-model",
        "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2},
    })
    .to_string()
}

pub fn ok_reply(content: &str) -> Result<EndpointReply, String> {
    Ok(EndpointReply {
        status: 200,
        status_text: "OK".to_string(),
        body: completion_body(content),
    })
}

pub fn error_reply(status: u16, status_text: &str, body: &str) -> Result<EndpointReply, String> {
    Ok(EndpointReply {
        status,
        status_text: status_text.to_string(),
        body: body.to_string(),
    })
}

#[derive(Default)]
struct ScriptState {
    replies: VecDeque<Result<EndpointReply, String>>,
    requests: Vec<ChatRequest>,
    call_times: Vec<Instant>,
}

/// Endpoint that answers from a fixed script and records what it was sent.
/// Running past the end of the script is a transport failure.
pub struct ScriptedEndpoint {
    state: Mutex<ScriptState>,
    latency: Duration,
}

impl ScriptedEndpoint {
    pub fn new(replies: Vec<Result<EndpointReply, String>>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                replies: replies.into(),
                ..Default::default()
            }),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().call_times.clone()
    }
}

#[async_trait]
impl CompletionEndpoint for ScriptedEndpoint {
    fn url(&self) -> &str {
        "http://scripted.test/v1/chat/completions"
    }

    async fn post(&self, request: &ChatRequest) -> Result<EndpointReply, String> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            state.call_times.push(Instant::now());
            state
                .replies
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        reply
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Rendered(Vec<Bubble>),
    Bubble(Bubble, Instant),
    Typing,
    TypingHidden,
    Notice(Notice),
}

/// Surface that records every call in order.
#[derive(Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_render(&self) -> Vec<Bubble> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                SurfaceEvent::Rendered(bubbles) => Some(bubbles),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn shown_bubbles(&self) -> Vec<(Bubble, Instant)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Bubble(bubble, at) => Some((bubble, at)),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SurfaceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ChatSurface for RecordingSurface {
    fn render_transcript(&self, _character: &Character, bubbles: &[Bubble]) {
        self.push(SurfaceEvent::Rendered(bubbles.to_vec()));
    }

    fn show_bubble(&self, _character: &Character, bubble: &Bubble) {
        self.push(SurfaceEvent::Bubble(bubble.clone(), Instant::now()));
    }

    fn show_typing(&self, _character: &Character) {
        self.push(SurfaceEvent::Typing);
    }

    fn hide_typing(&self) {
        self.push(SurfaceEvent::TypingHidden);
    }

    fn notice(&self, notice: &Notice) {
        self.push(SurfaceEvent::Notice(notice.clone()));
    }
}

/// In-memory writer whose contents stay readable after it is boxed away.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn test_character(id: &str, name: &str) -> Character {
    Character {
        id: id.to_string(),
        name: name.to_string(),
        persona: format!("You are {name}."),
        avatar: String::new(),
    }
}

/// Settings for pipeline tests: delay-send off unless a test turns it on.
pub fn test_settings() -> Settings {
    Settings {
        enable_delay_send: false,
        ..Default::default()
    }
}

pub fn test_context(settings: Settings, characters: Vec<Character>) -> SharedContext {
    AppContext::new(settings, characters, Transcripts::new()).into_shared()
}

pub fn test_transport(endpoint: &Arc<ScriptedEndpoint>, recorder: &DebugRecorder) -> Transport {
    let endpoint: Arc<dyn CompletionEndpoint> = endpoint.clone();
    Transport::new(endpoint, recorder.clone())
}

pub fn test_store(dir: &tempfile::TempDir) -> DataStore {
    DataStore::new(dir.path())
}
