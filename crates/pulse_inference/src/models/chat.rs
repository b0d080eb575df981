use std::fmt;

use async_trait::async_trait;
use pulse_core::{Error, InferenceModel, Result, Sentiment};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{parse_topics, sentiment_prompt, summary_prompt, topics_prompt};

pub const OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_BASE: &str = "https://api.deepseek.com/v1";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

/// Any provider speaking the OpenAI chat-completions protocol.
pub struct ChatModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatModel {
    pub fn new(client: Client, api_key: String, base_url: &str, model: &str) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn openai(client: Client, api_key: String) -> Self {
        Self::new(client, api_key, OPENAI_BASE, "gpt-4o-mini")
    }

    pub fn deepseek(client: Client, api_key: String) -> Self {
        Self::new(client, api_key, DEEPSEEK_BASE, "deepseek-chat")
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!("{} returned {}: {}", self.model, status, body.trim())));
        }

        let response: ChatResponse = response.json().await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| Error::Inference(format!("{} returned no choices", self.model)))
    }
}

impl fmt::Debug for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl InferenceModel for ChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.complete(&summary_prompt(text)).await
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<Sentiment> {
        Ok(Sentiment::parse(&self.complete(&sentiment_prompt(text)).await?))
    }

    async fn extract_topics(&self, text: &str) -> Result<Vec<String>> {
        Ok(parse_topics(&self.complete(&topics_prompt(text)).await?))
    }
}
