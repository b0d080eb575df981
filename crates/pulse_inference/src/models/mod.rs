use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use pulse_core::{Error, InferenceModel, Result};
use regex::Regex;
use reqwest::Client;
use tracing::info;

use crate::Config;

pub mod chat;
pub mod dummy;
pub mod gemini;

pub use chat::ChatModel;
pub use dummy::DummyModel;
pub use gemini::GeminiModel;

pub const DEFAULT_MODEL: &str = "dummy";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

lazy_static! {
    static ref LIST_MARKER: Regex = Regex::new(r"^(?:\d+[.)]|[-*•])\s*").unwrap();
}

pub(crate) fn summary_prompt(text: &str) -> String {
    format!(
        "Please provide a concise 2-3 sentence summary of the following text, focusing on the key points and insights:\n\n{}\n\nSummary:",
        text
    )
}

pub(crate) fn sentiment_prompt(text: &str) -> String {
    format!(
        "Analyze the sentiment of the following text and respond with ONLY one word - either \"positive\", \"negative\", or \"neutral\":\n\n{}\n\nSentiment:",
        text
    )
}

pub(crate) fn topics_prompt(text: &str) -> String {
    format!(
        "Extract 3-5 main topics or themes from the following text.\nRespond with ONLY the topics, one per line, no numbers or bullets:\n\n{}\n\nTopics:",
        text
    )
}

/// One topic per line; list markers the model adds anyway are stripped.
pub fn parse_topics(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|line| LIST_MARKER.replace(line.trim(), "").trim().to_string())
        .filter(|topic| !topic.is_empty())
        .collect()
}

fn require_key(provider: &str, api_key: Option<&str>) -> Result<String> {
    api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Inference(format!("{} API key is required", provider)))
}

pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder().timeout(timeout).build().map_err(Error::from)
}

/// Builds the model named in `config`, e.g. `gemini`, `deepseek` or `openai:gpt-4o`.
pub async fn create_model(config: Option<Config>) -> Result<Arc<dyn InferenceModel>> {
    let config = config.unwrap_or_default();
    let name = config.model_name.as_deref().unwrap_or(DEFAULT_MODEL).trim();
    let (provider, model_id) = match name.split_once(':') {
        Some((provider, model_id)) => (provider.to_lowercase(), Some(model_id.to_string())),
        None => (name.to_lowercase(), None),
    };
    let client = http_client(REQUEST_TIMEOUT)?;

    let model: Arc<dyn InferenceModel> = match provider.as_str() {
        "gemini" => {
            let key = require_key("Gemini", config.api_key.as_deref())?;
            let mut model = GeminiModel::new(client, key);
            if let Some(url) = config.model_url.as_deref() {
                model = model.with_base_url(url);
            }
            if let Some(id) = model_id {
                model = model.with_model(id);
            }
            Arc::new(model)
        }
        "openai" | "deepseek" => {
            let key = require_key(&provider, config.api_key.as_deref())?;
            let mut model = if provider == "openai" {
                ChatModel::openai(client, key)
            } else {
                ChatModel::deepseek(client, key)
            };
            if let Some(url) = config.model_url.as_deref() {
                model = model.with_base_url(url);
            }
            if let Some(id) = model_id {
                model = model.with_model(id);
            }
            Arc::new(model)
        }
        "dummy" => Arc::new(DummyModel::new()),
        other => {
            return Err(Error::Config(format!(
                "Unknown model: {}. Available models: gemini, openai, deepseek, dummy",
                other
            )))
        }
    };

    info!("🧠 Inference model ready: {}", model.name());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(name: &str, key: Option<&str>) -> Option<Config> {
        Some(Config {
            model_name: Some(name.to_string()),
            api_key: key.map(str::to_string),
            model_url: None,
        })
    }

    #[test]
    fn test_parse_topics() {
        let reply = "1. Open models\n2) Funding\n\n- Developer tools\n• GPU supply\n   ";
        assert_eq!(
            parse_topics(reply),
            vec!["Open models", "Funding", "Developer tools", "GPU supply"]
        );
        assert_eq!(parse_topics("3D printing\n"), vec!["3D printing"]);
        assert!(parse_topics("\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_create_model() {
        assert_eq!(create_model(None).await.unwrap().name(), "dummy");
        assert_eq!(create_model(config("gemini", Some("k"))).await.unwrap().name(), "gemini-pro");
        assert_eq!(create_model(config("DeepSeek", Some("k"))).await.unwrap().name(), "deepseek-chat");
        assert_eq!(
            create_model(config("openai:gpt-4o", Some("k"))).await.unwrap().name(),
            "gpt-4o"
        );
    }

    #[tokio::test]
    async fn test_create_model_errors() {
        assert!(matches!(create_model(config("gemini", None)).await, Err(Error::Inference(_))));
        assert!(matches!(create_model(config("openai", Some("  "))).await, Err(Error::Inference(_))));
        assert!(matches!(create_model(config("ollama", None)).await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_http_client_gives_up_on_stalled_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = http_client(Duration::from_millis(200)).unwrap();
        let model = GeminiModel::new(client, "secret".to_string()).with_base_url(&server.uri());
        let started = std::time::Instant::now();
        assert!(model.summarize("text").await.is_err());
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
