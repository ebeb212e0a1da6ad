use serde::{Deserialize, Serialize};

use crate::config::{PromptProfile, SamplingByMode, SamplingParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Summarize,
    Chat,
}

impl PromptMode {
    /// Sampling is a per-mode policy, not a per-call choice.
    pub fn sampling(self, by_mode: &SamplingByMode) -> SamplingParams {
        match self {
            PromptMode::Summarize => by_mode.summarize,
            PromptMode::Chat => by_mode.chat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("chat mode requires a non-empty question")]
    MissingQuestion,
}

/// Builds role-tagged message lists for both conversation modes.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    profile: PromptProfile,
}

impl PromptBuilder {
    pub fn new(profile: PromptProfile) -> Self {
        Self { profile }
    }

    /// `body` is the reduced page text in summarize mode and the previous
    /// full response in chat mode.
    pub fn build(
        &self,
        mode: PromptMode,
        title: &str,
        body: &str,
        question: Option<&str>,
    ) -> Result<Vec<ChatMessage>, PromptError> {
        match mode {
            PromptMode::Summarize => Ok(self.summarize(None, title, body)),
            PromptMode::Chat => {
                let question = question
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .ok_or(PromptError::MissingQuestion)?;
                Ok(self.chat(body, question))
            }
        }
    }

    pub fn summarize(&self, url: Option<&str>, title: &str, body: &str) -> Vec<ChatMessage> {
        let mut payload = String::new();
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            payload.push_str(&format!("URL: {url}\n"));
        }
        payload.push_str(&format!("Title: {title}\n\nContent:\n{body}"));
        vec![
            ChatMessage::new(Role::System, self.summarize_instruction()),
            ChatMessage::new(Role::User, payload),
        ]
    }

    pub fn chat(&self, context: &str, question: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(Role::System, self.chat_instruction()),
            ChatMessage::new(Role::Assistant, context),
            ChatMessage::new(Role::User, question),
        ]
    }

    fn summarize_instruction(&self) -> String {
        let PromptProfile {
            language,
            summary_label,
            key_points_label,
        } = &self.profile;
        format!(
            "Summarize the text content provided last. If it is written in another language, \
             translate it into {language}.\n\n\
             Follow this format strictly and output nothing outside of it:\n\
             {summary_label}：one short sentence capturing the content, on its own line, \
             followed by a newline.\n\
             {key_points_label}：several key points about the content, one per line, each \
             starting with a decorative emoji, each followed by a newline.\n\n\
             The text content to summarize follows."
        )
    }

    fn chat_instruction(&self) -> String {
        format!(
            "You are a helpful assistant. Continue the conversation about the web page \
             summarized in your previous message, using only that context. Always answer in {}.",
            self.profile.language
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::new(Role::Assistant, "x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"x"}"#);
    }

    #[test]
    fn modes_pick_their_sampling() {
        let by_mode = SamplingByMode::default();
        assert_eq!(PromptMode::Summarize.sampling(&by_mode).temperature, 0.1);
        assert_eq!(PromptMode::Chat.sampling(&by_mode).temperature, 0.7);
    }
}
