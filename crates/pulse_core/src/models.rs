use async_trait::async_trait;
use crate::types::Sentiment;
use crate::Result;

/// A generative model used to enrich articles.
#[async_trait]
pub trait InferenceModel: Send + Sync {
    fn name(&self) -> &str;

    /// Two or three sentence summary of the text
    async fn summarize(&self, text: &str) -> Result<String>;

    /// Overall tone of the text
    async fn analyze_sentiment(&self, text: &str) -> Result<Sentiment>;

    /// Three to five main topics
    async fn extract_topics(&self, text: &str) -> Result<Vec<String>>;
}
