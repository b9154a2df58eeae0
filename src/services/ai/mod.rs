pub mod gemini;
pub mod quota;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String>;
}

/// Single-prompt convenience over [`LlmProvider::chat`].
pub async fn ask(llm: &dyn LlmProvider, prompt: &str) -> anyhow::Result<String> {
    llm.chat("", &[Message::user(prompt)]).await
}
