//! Drives one conversation: input, buffering, completion, splitting, display.
//!
//! A [`TurnOrchestrator`] is opened per character. User input is recorded in
//! the transcript right away and then handed to the [`DelayBuffer`]; each
//! coalesced turn goes through [`Transport::complete`] and the reply is split
//! and shown with pacing. Turns for one character never overlap: the turn
//! gate is held for the whole request/deliver cycle.

pub mod surface;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::character::Character;
use crate::core::constants::MULTI_MESSAGE_PACING;
use crate::core::context::{lock_context, SharedContext};
use crate::core::delay_buffer::{DelayBuffer, Submission};
use crate::core::message::{ChatMessage, Sender};
use crate::core::splitter::{Bubble, MessageSplitter};
use crate::core::store::DataStore;
use crate::core::transport::prompt::build_messages;
use crate::core::transport::Transport;

pub use surface::{ChatSurface, Notice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    /// Input is held by the delay buffer.
    Buffering,
    /// A turn is waiting on the endpoint or delivering its reply.
    AwaitingResponse,
}

#[derive(Debug)]
pub enum TurnError {
    UnknownCharacter(String),
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::UnknownCharacter(id) => write!(f, "No character with id '{id}'"),
        }
    }
}

impl std::error::Error for TurnError {}

pub struct TurnOrchestrator {
    character_id: String,
    context: SharedContext,
    store: DataStore,
    transport: Transport,
    surface: Arc<dyn ChatSurface>,
    buffer: DelayBuffer,
    in_flight: AtomicUsize,
    turn_gate: tokio::sync::Mutex<()>,
    pacing: Duration,
    /// Multi-message reply still being paced out. Renders hide its chunks
    /// past `shown` so the surface never sees them ahead of the pacing.
    reveal: Mutex<Option<Reveal>>,
}

#[derive(Debug, Clone, Copy)]
struct Reveal {
    /// Position of the multi-message record in the transcript.
    index: usize,
    shown: usize,
}

impl TurnOrchestrator {
    /// Open the conversation with `character_id` and render its transcript.
    /// The returned receiver yields turns flushed by the delay timer; feed it
    /// to [`TurnOrchestrator::drive`].
    pub fn open(
        character_id: &str,
        context: SharedContext,
        store: DataStore,
        transport: Transport,
        surface: Arc<dyn ChatSurface>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>), TurnError> {
        let (enabled, delay) = {
            let ctx = lock_context(&context);
            if ctx.character(character_id).is_none() {
                return Err(TurnError::UnknownCharacter(character_id.to_string()));
            }
            (
                ctx.settings.enable_delay_send,
                ctx.settings.reply_delay_duration(),
            )
        };
        let (buffer, flushes) = DelayBuffer::new(enabled, delay);

        let orchestrator = Self {
            character_id: character_id.to_string(),
            context,
            store,
            transport,
            surface,
            buffer,
            in_flight: AtomicUsize::new(0),
            turn_gate: tokio::sync::Mutex::new(()),
            pacing: MULTI_MESSAGE_PACING,
            reveal: Mutex::new(None),
        };
        {
            let mut ctx = lock_context(&orchestrator.context);
            ctx.transcripts
                .entry(orchestrator.character_id.clone())
                .or_default();
        }
        orchestrator.render();
        info!(character = %orchestrator.character_id, delay_send = enabled, "conversation opened");
        Ok((orchestrator, flushes))
    }

    pub fn state(&self) -> TurnState {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            TurnState::AwaitingResponse
        } else if self.buffer.pending() > 0 {
            TurnState::Buffering
        } else {
            TurnState::Idle
        }
    }

    /// Record user input and buffer it. Returns the turn text when it must be
    /// sent right away (delay-send off); blank input is ignored.
    pub fn submit(&self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.append(ChatMessage::user(text));
        self.render();

        match self.buffer.submit(text) {
            Submission::Immediate(turn) => Some(turn),
            Submission::Buffered { pending } => {
                if self.show_delay_hint() {
                    self.surface.notice(&Notice::Collecting { pending });
                }
                None
            }
        }
    }

    /// Cancel the delay timer and hand back whatever was buffered.
    pub fn flush_now(&self) -> Option<String> {
        self.buffer.flush_now()
    }

    /// Run every turn flushed by the delay timer until the buffer is dropped.
    pub async fn drive(&self, mut flushes: mpsc::UnboundedReceiver<String>) {
        while let Some(turn) = flushes.recv().await {
            self.run_turn(turn).await;
        }
    }

    /// Stop buffering: cancel the delay timer and close the flush channel,
    /// so [`drive`](Self::drive) returns after the turns already queued.
    /// Returns input that was still buffered.
    pub fn close_input(&self) -> Option<String> {
        self.buffer.close()
    }

    /// Request a reply for `turn` and deliver it, or record the failure.
    pub async fn run_turn(&self, turn: String) {
        let _in_flight = InFlight::enter(&self.in_flight);
        let _gate = self.turn_gate.lock().await;

        let snapshot = {
            let ctx = lock_context(&self.context);
            ctx.character(&self.character_id).cloned().map(|character| {
                let messages = build_messages(
                    &ctx.settings,
                    &character,
                    ctx.transcript(&self.character_id),
                    &turn,
                );
                (
                    character,
                    messages,
                    ctx.settings.model.clone(),
                    MessageSplitter::from_settings(&ctx.settings),
                )
            })
        };
        let Some((character, messages, model, splitter)) = snapshot else {
            warn!(character = %self.character_id, "character vanished before turn");
            return;
        };

        debug!(character = %character.id, messages = messages.len(), "turn started");
        self.surface.show_typing(&character);
        let surface = Arc::clone(&self.surface);
        let on_retry = move |retry: u32| surface.notice(&Notice::Retrying { retry });
        let result = self.transport.complete(&model, messages, &on_retry).await;
        self.surface.hide_typing();

        match result {
            Ok(raw) => self.deliver(&character, &splitter, raw).await,
            Err(err) => {
                warn!(character = %character.id, attempts = err.attempts.len(), "turn failed");
                self.append(ChatMessage::ai(err.user_summary()));
                self.render();
            }
        }
    }

    /// Empty the open transcript.
    pub fn clear_transcript(&self) {
        *self.lock_reveal() = None;
        {
            let mut ctx = lock_context(&self.context);
            ctx.transcripts.insert(self.character_id.clone(), Vec::new());
        }
        self.persist();
        self.surface.notice(&Notice::Cleared);
        self.render();
    }

    /// Show the current transcript through the surface.
    pub fn render(&self) {
        let reveal = self.lock_reveal();
        let rendered = {
            let ctx = lock_context(&self.context);
            ctx.character(&self.character_id).cloned().map(|character| {
                let splitter = MessageSplitter::from_settings(&ctx.settings);
                let bubbles =
                    visible_bubbles(&splitter, ctx.transcript(&self.character_id), *reveal);
                (character, bubbles)
            })
        };
        if let Some((character, bubbles)) = rendered {
            self.surface.render_transcript(&character, &bubbles);
        }
    }

    async fn deliver(&self, character: &Character, splitter: &MessageSplitter, raw: String) {
        let mut chunks = splitter.split(&raw);
        match chunks.len() {
            0 => {
                self.append(ChatMessage::ai(raw.trim()));
                self.render();
            }
            1 => {
                let chunk = chunks.remove(0);
                self.append(ChatMessage::ai(chunk.trim()));
                self.render();
            }
            count => {
                debug!(chunks = count, "delivering multi-message reply");
                {
                    let mut reveal = self.lock_reveal();
                    let mut ctx = lock_context(&self.context);
                    ctx.append(&self.character_id, ChatMessage::ai_multi(raw));
                    let index = ctx.transcript(&self.character_id).len().saturating_sub(1);
                    *reveal = Some(Reveal { index, shown: 0 });
                }
                self.persist();

                for (index, chunk) in chunks.into_iter().enumerate() {
                    if index > 0 {
                        tokio::time::sleep(self.pacing).await;
                    }
                    let mut reveal = self.lock_reveal();
                    let Some(progress) = reveal.as_mut() else {
                        debug!("transcript cleared while pacing");
                        return;
                    };
                    progress.shown += 1;
                    if progress.shown == count {
                        *reveal = None;
                    }
                    self.surface
                        .show_bubble(character, &Bubble::new(Sender::Ai, chunk));
                }
            }
        }
    }

    /// Append to the open transcript and write the transcripts through.
    fn append(&self, message: ChatMessage) {
        lock_context(&self.context).append(&self.character_id, message);
        self.persist();
    }

    fn persist(&self) {
        let result = {
            let ctx = lock_context(&self.context);
            self.store.save_transcripts(&ctx.transcripts)
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to persist transcripts");
            self.surface.notice(&Notice::PersistFailed(err.to_string()));
        }
    }

    fn show_delay_hint(&self) -> bool {
        lock_context(&self.context).settings.show_delay_hint
    }

    /// Taken before the context lock whenever both are held.
    fn lock_reveal(&self) -> MutexGuard<'_, Option<Reveal>> {
        self.reveal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Transcript bubbles, holding back the chunks of a reply still being paced.
fn visible_bubbles(
    splitter: &MessageSplitter,
    transcript: &[ChatMessage],
    reveal: Option<Reveal>,
) -> Vec<Bubble> {
    let Some(Reveal { index, shown }) = reveal.filter(|r| r.index < transcript.len()) else {
        return splitter.render(transcript);
    };
    let record = &transcript[index];
    let mut bubbles = splitter.render(&transcript[..index]);
    bubbles.extend(
        splitter
            .split(&record.content)
            .into_iter()
            .take(shown)
            .map(|chunk| Bubble::new(record.sender, chunk)),
    );
    bubbles.extend(splitter.render(&transcript[index + 1..]));
    bubbles
}

/// Counts a turn as in flight for as long as it is alive.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
