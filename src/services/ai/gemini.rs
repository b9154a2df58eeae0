use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{LlmProvider, Message};
use crate::errors::AppError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_body(system_prompt: &str, messages: &[Message]) -> Value {
        let contents: Vec<Value> = messages
            .iter()
            .map(|msg| {
                let role = if msg.role == "assistant" { "model" } else { "user" };
                json!({
                    "role": role,
                    "parts": [{ "text": msg.content }],
                })
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": 500,
                "temperature": 0.3,
            },
        });
        if !system_prompt.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system_prompt }] });
        }
        body
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let body = Self::request_body(system_prompt, messages);

        let resp = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .context("failed to call Gemini API")?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .context("failed to parse Gemini response")?;

        if !status.is_success() {
            tracing::error!(%status, "Gemini request failed");
            let message = format!("Gemini API error ({status}): {}", error_message(&data));
            return Err(AppError::Ai(message).into());
        }

        Ok(extract_text(&data)?)
    }
}

fn error_message(data: &Value) -> &str {
    data["error"]["message"].as_str().unwrap_or("unknown error")
}

fn extract_text(data: &Value) -> Result<String, AppError> {
    if data.get("error").is_some() {
        return Err(AppError::Ai(format!("Gemini API error: {}", error_message(data))));
    }

    let candidate = data["candidates"]
        .get(0)
        .ok_or_else(|| AppError::Ai("no candidates in Gemini response".to_string()))?;

    candidate["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::Ai("missing answer text in Gemini response".to_string()))
}
