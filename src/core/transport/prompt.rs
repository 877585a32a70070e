//! Builds the upstream message list for a turn.

use crate::api::ChatMessage as ApiMessage;
use crate::character::Character;
use crate::core::config::data::{Settings, DEFAULT_ROLE_PLAY_PROMPT};
use crate::core::message::{ChatMessage, Sender};
use crate::core::splitter::MessageSplitter;

/// System prompt: role-play preamble (when enabled) plus persona, plus the
/// separator convention when multi-message replies are on.
pub fn build_system_prompt(settings: &Settings, character: &Character) -> String {
    let persona = character.effective_persona();
    let mut prompt = if settings.enable_role_play {
        let preamble = if settings.role_play_prompt.trim().is_empty() {
            DEFAULT_ROLE_PLAY_PROMPT
        } else {
            settings.role_play_prompt.as_str()
        };
        format!("{preamble}\n\n{persona}")
    } else {
        persona.to_string()
    };

    if settings.enable_multi_message {
        let splitter = MessageSplitter::from_settings(settings);
        let sep = splitter.separator();
        prompt.push_str(&format!(
            "\n\n重要：请在你的回复中使用{sep}作为分隔符，将长回复拆分为多条短消息。这样可以让对话更加自然流畅。例如：你好{sep}今天天气不错呢{sep}你说对吧。"
        ));
    }
    prompt
}

/// `[system] + transcript tail (context_count entries) + current user turn`.
pub fn build_messages(
    settings: &Settings,
    character: &Character,
    transcript: &[ChatMessage],
    user_turn: &str,
) -> Vec<ApiMessage> {
    let tail_start = transcript.len().saturating_sub(settings.context_count);
    let mut messages = Vec::with_capacity(transcript.len() - tail_start + 2);

    messages.push(ApiMessage::new(
        "system",
        build_system_prompt(settings, character),
    ));
    messages.extend(
        transcript[tail_start..]
            .iter()
            .map(|m| ApiMessage::new(m.sender.to_api_role(), m.content.clone())),
    );
    messages.push(ApiMessage::new(Sender::User.to_api_role(), user_turn));
    messages
}
