//! Application state shared between the chat loop and in-flight turns.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::character::Character;
use crate::core::config::Settings;
use crate::core::message::{ChatMessage, Transcripts};
use crate::core::store::{DataStore, StoreError};

pub struct AppContext {
    pub settings: Settings,
    pub characters: Vec<Character>,
    pub transcripts: Transcripts,
}

/// Handle passed to every component that reads or mutates the context.
/// The lock is never held across an `.await`.
pub type SharedContext = Arc<Mutex<AppContext>>;

impl AppContext {
    pub fn new(settings: Settings, characters: Vec<Character>, transcripts: Transcripts) -> Self {
        Self {
            settings,
            characters,
            transcripts,
        }
    }

    /// Load characters and transcripts from `store`.
    pub fn load(settings: Settings, store: &DataStore) -> Result<Self, StoreError> {
        Ok(Self::new(
            settings,
            store.load_characters()?,
            store.load_transcripts()?,
        ))
    }

    pub fn into_shared(self) -> SharedContext {
        Arc::new(Mutex::new(self))
    }

    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn transcript(&self, character_id: &str) -> &[ChatMessage] {
        self.transcripts
            .get(character_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Append to a character's transcript, creating it on first use.
    pub fn append(&mut self, character_id: &str, message: ChatMessage) {
        self.transcripts
            .entry(character_id.to_string())
            .or_default()
            .push(message);
    }
}

pub fn lock_context(context: &SharedContext) -> MutexGuard<'_, AppContext> {
    context.lock().unwrap_or_else(PoisonError::into_inner)
}
