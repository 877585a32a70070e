//! Splits a raw completion into the bubbles of a multi-message reply.

use crate::core::config::data::{Settings, DEFAULT_SEPARATOR};
use crate::core::message::{ChatMessage, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSplitter {
    enabled: bool,
    separator: String,
}

/// One displayable chat bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub sender: Sender,
    pub content: String,
}

impl Bubble {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
        }
    }
}

impl MessageSplitter {
    /// A blank separator falls back to `@@@@`; splitting on the empty string
    /// would explode the reply into single characters.
    pub fn new(enabled: bool, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        let separator = if separator.trim().is_empty() {
            DEFAULT_SEPARATOR.to_string()
        } else {
            separator
        };
        Self { enabled, separator }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.enable_multi_message,
            settings.multi_message_separator.clone(),
        )
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Disabled: the raw text as a single chunk, untouched. Enabled: the
    /// trimmed, non-empty pieces between separators, in order. May be empty
    /// when the input holds nothing but separators and whitespace.
    pub fn split(&self, raw: &str) -> Vec<String> {
        if !self.enabled {
            return vec![raw.to_string()];
        }

        raw.split(self.separator.as_str())
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Expand a transcript into bubbles, re-splitting multi-message records.
    pub fn render(&self, transcript: &[ChatMessage]) -> Vec<Bubble> {
        let mut bubbles = Vec::with_capacity(transcript.len());
        for message in transcript {
            if message.is_multi_message {
                bubbles.extend(
                    self.split(&message.content)
                        .into_iter()
                        .map(|chunk| Bubble::new(message.sender, chunk)),
                );
            } else {
                bubbles.push(Bubble::new(message.sender, message.content.clone()));
            }
        }
        bubbles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(separator: &str) -> MessageSplitter {
        MessageSplitter::new(true, separator)
    }

    #[test]
    fn disabled_returns_raw_text_unchanged() {
        let splitter = MessageSplitter::new(false, "@@@@");
        assert_eq!(splitter.split("  a@@@@b  "), vec!["  a@@@@b  "]);
    }

    #[test]
    fn k_separators_yield_k_plus_one_trimmed_chunks() {
        for separator in ["@@@@", "||", "\n---\n", "分隔"] {
            let segments = ["first", " second ", "third\n", "\tfourth"];
            for k in 1..segments.len() {
                let text = segments[..=k].join(separator);
                let chunks = enabled(separator).split(&text);
                assert_eq!(chunks.len(), k + 1, "separator {separator:?}, k {k}");
                for (chunk, segment) in chunks.iter().zip(segments.iter()) {
                    assert_eq!(chunk, segment.trim());
                }
            }
        }
    }

    #[test]
    fn adjacent_and_edge_separators_drop_empty_chunks() {
        let chunks = enabled("@@@@").split("@@@@hello@@@@@@@@  @@@@world@@@@");
        assert_eq!(chunks, vec!["hello", "world"]);
    }

    #[test]
    fn text_without_separator_is_one_trimmed_chunk() {
        assert_eq!(enabled("@@@@").split("  just one  "), vec!["just one"]);
    }

    #[test]
    fn separator_only_input_yields_no_chunks() {
        assert!(enabled("@@@@").split("@@@@ \n @@@@").is_empty());
        assert!(enabled("@@@@").split("").is_empty());
    }

    #[test]
    fn blank_separator_falls_back_to_default() {
        let splitter = MessageSplitter::new(true, "  ");
        assert_eq!(splitter.separator(), "@@@@");
        assert_eq!(splitter.split("a@@@@b"), vec!["a", "b"]);
    }

    #[test]
    fn render_resplits_multi_records_identically_every_time() {
        let splitter = enabled("@@@@");
        let transcript = vec![
            ChatMessage::user("hi"),
            ChatMessage::ai_multi("hello@@@@how are you"),
            ChatMessage::ai("plain@@@@stays whole"),
        ];

        let first = splitter.render(&transcript);
        let second = splitter.render(&transcript);

        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                Bubble::new(Sender::User, "hi"),
                Bubble::new(Sender::Ai, "hello"),
                Bubble::new(Sender::Ai, "how are you"),
                Bubble::new(Sender::Ai, "plain@@@@stays whole"),
            ]
        );
        assert_eq!(transcript[1].content, "hello@@@@how are you");
    }
}
