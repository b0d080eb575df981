use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{Article, ArticleQuery, ArticleStorage, ChannelConfig, Error, Result};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct ChannelRecord {
    config: ChannelConfig,
    last_scraped: Option<DateTime<Utc>>,
}

/// Process-local store. Everything is lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    articles: RwLock<HashMap<String, Article>>,
    channels: RwLock<HashMap<String, ChannelRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn last_scraped(&self, username: &str) -> Option<DateTime<Utc>> {
        self.channels.read().await.get(username).and_then(|c| c.last_scraped)
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn save_article(&self, article: &Article) -> Result<()> {
        self.articles
            .write()
            .await
            .insert(article.id.clone(), article.clone());
        Ok(())
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        Ok(self.articles.read().await.get(id).cloned())
    }

    async fn get_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let articles = self.articles.read().await;
        let mut matching: Vec<&Article> = articles
            .values()
            .filter(|a| query.category.map_or(true, |c| a.category == c))
            .filter(|a| query.language.map_or(true, |l| a.language == l))
            .collect();
        matching.sort_by(|a, b| b.published_at.cmp(&a.published_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn delete_article(&self, id: &str) -> Result<()> {
        self.articles.write().await.remove(id);
        Ok(())
    }

    async fn upsert_channel(&self, channel: &ChannelConfig) -> Result<()> {
        let mut channels = self.channels.write().await;
        let last_scraped = channels.get(&channel.username).and_then(|c| c.last_scraped);
        channels.insert(
            channel.username.clone(),
            ChannelRecord {
                config: channel.clone(),
                last_scraped,
            },
        );
        Ok(())
    }

    async fn mark_channel_scraped(&self, username: &str, at: DateTime<Utc>) -> Result<()> {
        match self.channels.write().await.get_mut(username) {
            Some(record) => {
                record.last_scraped = Some(at);
                Ok(())
            }
            None => Err(Error::NotFound(format!("channel @{}", username))),
        }
    }

    async fn list_channels(&self) -> Result<Vec<ChannelConfig>> {
        let mut channels: Vec<ChannelConfig> = self
            .channels
            .read()
            .await
            .values()
            .map(|c| c.config.clone())
            .collect();
        channels.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(channels)
    }
}
