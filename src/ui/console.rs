//! Line-oriented chat surface for a plain terminal.
//!
//! Transcript renders are incremental: only bubbles past the ones already on
//! screen are printed, so re-rendering after every append does not repeat the
//! conversation. A render shorter than what was printed means the transcript
//! was cleared and starts the count over.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::character::Character;
use crate::core::constants::TYPING_PLACEHOLDER;
use crate::core::message::Sender;
use crate::core::splitter::Bubble;
use crate::core::turn::{ChatSurface, Notice};

const CLEAR_LINE: &str = "\r\x1b[2K";

struct ConsoleState {
    writer: Box<dyn Write + Send>,
    printed: usize,
    /// Name shown in the typing placeholder while one is on screen.
    typing: Option<String>,
}

pub struct ConsoleSurface {
    state: Mutex<ConsoleState>,
}

impl ConsoleSurface {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                writer,
                printed: 0,
                typing: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConsoleState {
    /// Run `f` with the typing placeholder lifted off the current line.
    fn above_placeholder(&mut self, f: impl FnOnce(&mut dyn Write) -> io::Result<()>) {
        let typing = self.typing.clone();
        let result = (|| {
            if typing.is_some() {
                write!(self.writer, "{CLEAR_LINE}")?;
            }
            f(&mut self.writer)?;
            if let Some(name) = &typing {
                write!(self.writer, "{name}: {TYPING_PLACEHOLDER}")?;
            }
            self.writer.flush()
        })();
        report(result);
    }
}

fn report(result: io::Result<()>) {
    if let Err(err) = result {
        tracing::debug!(error = %err, "console write failed");
    }
}

fn write_bubble(out: &mut dyn Write, character: &Character, bubble: &Bubble) -> io::Result<()> {
    let label = match bubble.sender {
        Sender::User => "You",
        Sender::Ai => character.name.as_str(),
    };
    let mut lines = bubble.content.lines();
    writeln!(out, "{label}: {}", lines.next().unwrap_or_default())?;
    let indent = " ".repeat(label.chars().count() + 2);
    for line in lines {
        writeln!(out, "{indent}{line}")?;
    }
    Ok(())
}

impl ChatSurface for ConsoleSurface {
    fn render_transcript(&self, character: &Character, bubbles: &[Bubble]) {
        let mut state = self.lock();
        if bubbles.len() < state.printed {
            state.printed = 0;
        }
        let start = state.printed;
        state.above_placeholder(|out| {
            for bubble in &bubbles[start..] {
                write_bubble(out, character, bubble)?;
            }
            Ok(())
        });
        state.printed = bubbles.len();
    }

    fn show_bubble(&self, character: &Character, bubble: &Bubble) {
        let mut state = self.lock();
        state.above_placeholder(|out| write_bubble(out, character, bubble));
        state.printed += 1;
    }

    fn show_typing(&self, character: &Character) {
        let mut state = self.lock();
        let prefix = if state.typing.is_some() { CLEAR_LINE } else { "" };
        state.typing = Some(character.name.clone());
        let name = &character.name;
        let writer = &mut state.writer;
        report(write!(writer, "{prefix}{name}: {TYPING_PLACEHOLDER}").and_then(|()| writer.flush()));
    }

    fn hide_typing(&self) {
        let mut state = self.lock();
        if state.typing.take().is_some() {
            state.above_placeholder(|out| write!(out, "{CLEAR_LINE}"));
        }
    }

    fn notice(&self, notice: &Notice) {
        let mut state = self.lock();
        state.above_placeholder(|out| writeln!(out, "  ({notice})"));
    }
}
