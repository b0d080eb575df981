use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{Article, Error, Result, Source};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

pub mod devto;
pub mod hackernews;
pub mod reddit;

pub use devto::DevToSource;
pub use hackernews::HackerNewsSource;
pub use reddit::RedditSource;

const USER_AGENT: &str = concat!("pulse/", env!("CARGO_PKG_VERSION"));

/// Translates one external API into the shared article model.
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn source(&self) -> Source;

    /// Current top items, at most `limit`
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Article>>;

    /// Items matching a free-text query, at most `limit`
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>>;
}

pub fn default_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(20))
        .build()
        .map_err(Error::from)
}

/// The three polled APIs with their public endpoints.
pub fn default_sources(client: &Client) -> Vec<Arc<dyn NewsSource>> {
    vec![
        Arc::new(HackerNewsSource::new(client.clone())),
        Arc::new(DevToSource::new(client.clone())),
        Arc::new(RedditSource::new(client.clone())),
    ]
}

/// Common utilities for source adapters
pub(crate) mod utils {
    use super::*;

    pub fn parse_base(base: &str) -> Result<Url> {
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        Url::parse(&base).map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))
    }

    pub async fn get_json<T: DeserializeOwned>(client: &Client, url: Url, query: &[(&str, String)]) -> Result<T> {
        let response = client.get(url.clone()).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scraping(format!("{} returned {}", url, status)));
        }
        Ok(response.json::<T>().await?)
    }

    pub fn from_epoch(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
    }

    pub fn non_empty(text: Option<String>) -> Option<String> {
        text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
    }
}
