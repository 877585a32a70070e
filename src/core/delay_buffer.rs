//! Debounced coalescing of rapid user input.
//!
//! Every submit restarts a single-shot timer; only when the timer runs out
//! without interruption are the buffered lines joined and delivered on the
//! flush channel. The timer slot holds at most one live timer. Closing the
//! buffer drops the only sender, so the channel ends once drained.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::constants::MAX_REPLY_DELAY;

/// What the caller must do after [`DelayBuffer::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Buffering is off; send this text now.
    Immediate(String),
    /// Text was queued; `pending` lines now await the flush timer.
    Buffered { pending: usize },
}

struct PendingState {
    messages: Vec<String>,
    timer: Option<CancellationToken>,
    /// `None` once the buffer is closed.
    tx: Option<mpsc::UnboundedSender<String>>,
}

pub struct DelayBuffer {
    enabled: bool,
    delay: Duration,
    state: Arc<Mutex<PendingState>>,
}

impl DelayBuffer {
    /// Create a buffer and the receiver on which coalesced turns are delivered.
    /// `delay` is capped at [`MAX_REPLY_DELAY`].
    pub fn new(enabled: bool, delay: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let buffer = Self {
            enabled,
            delay: delay.min(MAX_REPLY_DELAY),
            state: Arc::new(Mutex::new(PendingState {
                messages: Vec::new(),
                timer: None,
                tx: Some(tx),
            })),
        };
        (buffer, rx)
    }

    pub fn pending(&self) -> usize {
        lock(&self.state).messages.len()
    }

    /// Queue `text` and restart the flush timer, or hand it straight back
    /// when buffering is disabled or the buffer is closed. Must be called
    /// inside a tokio runtime.
    pub fn submit(&self, text: impl Into<String>) -> Submission {
        let text = text.into();
        if !self.enabled {
            return Submission::Immediate(text);
        }

        let mut state = lock(&self.state);
        if state.tx.is_none() {
            return Submission::Immediate(text);
        }
        state.messages.push(text);
        if let Some(previous) = state.timer.take() {
            previous.cancel();
        }

        let token = CancellationToken::new();
        state.timer = Some(token.clone());
        // Deadline is fixed here, not when the task first runs.
        let deadline = Instant::now() + self.delay;
        let shared = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = sleep_until(deadline) => fire(&shared, &token),
            }
        });

        let pending = state.messages.len();
        debug!(pending, delay_ms = self.delay.as_millis() as u64, "delay timer restarted");
        Submission::Buffered { pending }
    }

    /// Cancel the timer and return the coalesced text right away. `None`
    /// when nothing is buffered.
    pub fn flush_now(&self) -> Option<String> {
        let mut state = lock(&self.state);
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }
        take_combined(&mut state)
    }

    /// Cancel the timer and close the flush channel. Turns already sent stay
    /// readable; later input is handed straight back. Returns whatever was
    /// still buffered.
    pub fn close(&self) -> Option<String> {
        let mut state = lock(&self.state);
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }
        state.tx = None;
        take_combined(&mut state)
    }
}

impl Drop for DelayBuffer {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.state).timer.take() {
            timer.cancel();
        }
    }
}

fn fire(state: &Mutex<PendingState>, token: &CancellationToken) {
    let mut state = lock(state);
    // A submit that raced the deadline has already replaced this timer.
    if token.is_cancelled() {
        return;
    }
    state.timer = None;
    let Some(combined) = take_combined(&mut state) else {
        return;
    };
    debug!(bytes = combined.len(), "delay timer fired");
    if let Some(tx) = &state.tx {
        let _ = tx.send(combined);
    }
}

fn take_combined(state: &mut PendingState) -> Option<String> {
    if state.messages.is_empty() {
        return None;
    }
    Some(std::mem::take(&mut state.messages).join("\n"))
}

fn lock(state: &Mutex<PendingState>) -> MutexGuard<'_, PendingState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn rapid_submits_flush_once_after_last_quiet_period() {
        let (buffer, mut rx) = DelayBuffer::new(true, Duration::from_secs(15));
        let start = Instant::now();

        assert_eq!(buffer.submit("one"), Submission::Buffered { pending: 1 });
        advance(Duration::from_secs(1)).await;
        assert_eq!(buffer.submit("two"), Submission::Buffered { pending: 2 });
        advance(Duration::from_secs(1)).await;
        assert_eq!(buffer.submit("three"), Submission::Buffered { pending: 3 });

        let combined = rx.recv().await.expect("flush delivered");
        assert_eq!(combined, "one\ntwo\nthree");
        assert_eq!(start.elapsed(), Duration::from_secs(17));
        assert_eq!(buffer.pending(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err(), "only one flush expected");
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_flushes_before_the_window_closes() {
        let (buffer, mut rx) = DelayBuffer::new(true, Duration::from_secs(15));
        buffer.submit("hello");

        advance(Duration::from_secs(14)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
        assert_eq!(buffer.pending(), 1);

        advance(Duration::from_secs(1)).await;
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_buffer_hands_text_back() {
        let (buffer, mut rx) = DelayBuffer::new(false, Duration::from_secs(15));
        assert_eq!(
            buffer.submit("now"),
            Submission::Immediate("now".to_string())
        );
        assert_eq!(buffer.pending(), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_flush_cancels_timer_and_empty_flush_is_noop() {
        let (buffer, mut rx) = DelayBuffer::new(true, Duration::from_secs(5));
        buffer.submit("a");
        buffer.submit("b");

        assert_eq!(buffer.flush_now().as_deref(), Some("a\nb"));
        assert_eq!(buffer.flush_now(), None);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err(), "cancelled timer must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn close_keeps_sent_turns_and_ends_the_channel() {
        let (buffer, mut rx) = DelayBuffer::new(true, Duration::from_secs(2));
        buffer.submit("already due");
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(buffer.close(), None);
        assert_eq!(rx.recv().await.as_deref(), Some("already due"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn close_returns_buffered_input_and_stops_buffering() {
        let (buffer, mut rx) = DelayBuffer::new(true, Duration::from_secs(5));
        buffer.submit("a");
        buffer.submit("b");

        assert_eq!(buffer.close().as_deref(), Some("a\nb"));
        assert_eq!(
            buffer.submit("late"),
            Submission::Immediate("late".to_string())
        );
        assert_eq!(buffer.pending(), 0);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_delay_is_capped() {
        let (buffer, mut rx) = DelayBuffer::new(true, Duration::MAX);
        let start = Instant::now();
        buffer.submit("eventually");

        assert_eq!(rx.recv().await.as_deref(), Some("eventually"));
        assert_eq!(start.elapsed(), MAX_REPLY_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn buffer_accepts_new_input_after_a_flush() {
        let (buffer, mut rx) = DelayBuffer::new(true, Duration::from_secs(2));
        buffer.submit("first");
        assert_eq!(rx.recv().await.as_deref(), Some("first"));

        buffer.submit("second");
        assert_eq!(rx.recv().await.as_deref(), Some("second"));
    }
}
