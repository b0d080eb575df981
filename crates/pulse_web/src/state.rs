use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pulse_core::{ArticleStorage, ChannelConfig, NewsPage};
use pulse_scrapers::NewsAggregator;
use tokio::sync::RwLock;

pub const NEWS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// `/api/news` responses keyed by their normalized query.
pub struct NewsCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, NewsPage)>>,
}

impl NewsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<NewsPage> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, page)| page.clone())
    }

    pub async fn insert(&self, key: String, page: NewsPage) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), page));
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for NewsCache {
    fn default() -> Self {
        Self::new(NEWS_CACHE_TTL)
    }
}

pub struct AppState {
    pub aggregator: Arc<NewsAggregator>,
    pub storage: Arc<dyn ArticleStorage>,
    pub channels: Vec<ChannelConfig>,
    pub cache: NewsCache,
}

impl AppState {
    pub fn new(aggregator: Arc<NewsAggregator>, storage: Arc<dyn ArticleStorage>, channels: Vec<ChannelConfig>) -> Self {
        Self {
            aggregator,
            storage,
            channels,
            cache: NewsCache::default(),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = NewsCache::new(ttl);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_news_cache_expires() {
        let cache = NewsCache::new(Duration::from_millis(50));
        cache.insert("page=1".to_string(), NewsPage::empty(1, 30)).await;
        assert!(cache.get("page=1").await.is_some());
        assert!(cache.get("page=2").await.is_none());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get("page=1").await.is_none());

        cache.insert("page=2".to_string(), NewsPage::empty(2, 30)).await;
        assert_eq!(cache.len().await, 1);
    }
}
