use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use pulse_core::{Article, Result, Source};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::utils::{self, from_epoch, get_json, non_empty};
use super::NewsSource;
use crate::classify;
use crate::html;

pub const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
pub const SEARCH_BASE: &str = "https://hn.algolia.com/api/v1";

#[derive(Debug, Deserialize)]
struct Story {
    id: u64,
    title: Option<String>,
    url: Option<String>,
    time: Option<i64>,
    score: Option<u64>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    #[serde(rename = "created_at")]
    created_at: Option<DateTime<Utc>>,
    points: Option<u64>,
    #[serde(rename = "story_text")]
    story_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HackerNewsSource {
    client: Client,
    api_base: String,
    search_base: String,
}

impl HackerNewsSource {
    pub fn new(client: Client) -> Self {
        Self::with_endpoints(client, API_BASE, SEARCH_BASE)
    }

    pub fn with_endpoints(client: Client, api_base: &str, search_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.to_string(),
            search_base: search_base.to_string(),
        }
    }

    fn discussion_url(id: &str) -> String {
        format!("https://news.ycombinator.com/item?id={}", id)
    }

    fn build(id: &str, title: String, url: Option<String>, published_at: DateTime<Utc>, score: u64, text: Option<String>) -> Article {
        let url = url.filter(|u| !u.is_empty()).unwrap_or_else(|| Self::discussion_url(id));
        let mut article = Article::new(Source::HackerNews, id, title, url, published_at);
        article.category = classify::categorize_title(&article.title);
        article.tags = classify::extract_tags(&article.title);
        article.score = score;
        article.content = non_empty(text.map(|t| html::clean_text(&t)));
        article
    }

    async fn fetch_story(&self, id: u64) -> Result<Option<Article>> {
        let url = utils::parse_base(&self.api_base)?.join(&format!("item/{}.json", id))?;
        let story: Option<Story> = get_json(&self.client, url, &[]).await?;
        Ok(story.and_then(|story| {
            let title = non_empty(story.title)?;
            Some(Self::build(
                &story.id.to_string(),
                title,
                story.url,
                story.time.map(from_epoch).unwrap_or_else(Utc::now),
                story.score.unwrap_or(0),
                story.text,
            ))
        }))
    }
}

#[async_trait]
impl NewsSource for HackerNewsSource {
    fn source(&self) -> Source {
        Source::HackerNews
    }

    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Article>> {
        let url = utils::parse_base(&self.api_base)?.join("topstories.json")?;
        let ids: Vec<u64> = get_json(&self.client, url, &[]).await?;
        debug!("🔶 Hacker News returned {} top story ids", ids.len());

        let stories = join_all(ids.into_iter().take(limit).map(|id| async move {
            match self.fetch_story(id).await {
                Ok(story) => story,
                Err(e) => {
                    warn!("Failed to fetch Hacker News story {}: {}", id, e);
                    None
                }
            }
        }))
        .await;

        Ok(stories.into_iter().flatten().collect())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>> {
        let url = utils::parse_base(&self.search_base)?.join("search")?;
        let response: SearchResponse = get_json(
            &self.client,
            url,
            &[
                ("query", query.to_string()),
                ("tags", "story".to_string()),
                ("hitsPerPage", limit.to_string()),
            ],
        )
        .await?;

        Ok(response
            .hits
            .into_iter()
            .filter_map(|hit| {
                let title = non_empty(hit.title)?;
                Some(Self::build(
                    &hit.object_id,
                    title,
                    hit.url,
                    hit.created_at.unwrap_or_else(Utc::now),
                    hit.points.unwrap_or(0),
                    hit.story_text,
                ))
            })
            .take(limit)
            .collect())
    }
}
