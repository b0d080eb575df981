pub mod models;

/// Which model to build and how to reach it.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// `gemini`, `openai`, `deepseek` or `dummy`, optionally followed by `:<model id>`
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    /// Overrides the provider's API base URL
    pub model_url: Option<String>,
}

pub mod prelude {
    pub use super::models::create_model;
    pub use super::Config;
    pub use pulse_core::{InferenceModel, Result, Error, Sentiment};
}

pub use models::create_model;
