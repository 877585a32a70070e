use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who authored a transcript record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }

    /// Role used when the record is replayed upstream as conversation context.
    pub fn to_api_role(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "assistant",
        }
    }
}

impl TryFrom<&str> for Sender {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Sender::User),
            "ai" => Ok(Sender::Ai),
            _ => Err(format!("invalid message sender: {value}")),
        }
    }
}

impl TryFrom<String> for Sender {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Sender> for String {
    fn from(value: Sender) -> Self {
        value.as_str().to_string()
    }
}

/// One persisted transcript record.
///
/// For AI records with `is_multi_message` set, `content` is the raw, unsplit
/// completion; the individual bubbles are recomputed on every render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(
        rename = "isMultiMessage",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub is_multi_message: bool,
}

impl ChatMessage {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            timestamp: Utc::now(),
            is_multi_message: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Sender::Ai, content)
    }

    pub fn ai_multi(raw: impl Into<String>) -> Self {
        Self {
            is_multi_message: true,
            ..Self::new(Sender::Ai, raw)
        }
    }
}

/// Character id to ordered transcript. Insertion order is chronological order.
pub type Transcripts = BTreeMap<String, Vec<ChatMessage>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_messages_omit_multi_flag() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert!(json.contains(r#""sender":"user""#));
        assert!(!json.contains("isMultiMessage"));
    }

    #[test]
    fn multi_messages_serialize_camel_case_flag() {
        let json = serde_json::to_string(&ChatMessage::ai_multi("a@@@@b")).unwrap();
        assert!(json.contains(r#""sender":"ai""#));
        assert!(json.contains(r#""isMultiMessage":true"#));
    }

    #[test]
    fn records_without_flag_load_as_single() {
        let raw = r#"{"sender":"ai","content":"hello","timestamp":"2024-05-01T08:00:00.000Z"}"#;
        let message: ChatMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(message.sender, Sender::Ai);
        assert!(!message.is_multi_message);
    }

    #[test]
    fn invalid_sender_strings_are_rejected() {
        assert!(Sender::try_from("assistant").is_err());
        let raw = r#"{"sender":"bot","content":"x","timestamp":"2024-05-01T08:00:00Z"}"#;
        assert!(serde_json::from_str::<ChatMessage>(raw).is_err());
    }

    #[test]
    fn api_roles_map_ai_to_assistant() {
        assert_eq!(Sender::User.to_api_role(), "user");
        assert_eq!(Sender::Ai.to_api_role(), "assistant");
    }
}
