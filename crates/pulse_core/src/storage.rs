use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::types::{Article, ArticleQuery, ChannelConfig};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Insert an article, or refresh it when the id already exists
    async fn save_article(&self, article: &Article) -> Result<()>;

    async fn get_article(&self, id: &str) -> Result<Option<Article>>;

    /// Newest first, narrowed by category and language
    async fn get_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>>;

    async fn delete_article(&self, id: &str) -> Result<()>;

    async fn upsert_channel(&self, channel: &ChannelConfig) -> Result<()>;

    async fn mark_channel_scraped(&self, username: &str, at: DateTime<Utc>) -> Result<()>;

    async fn list_channels(&self) -> Result<Vec<ChannelConfig>>;
}
