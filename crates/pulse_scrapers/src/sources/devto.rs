use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{Article, Result, Source};
use reqwest::Client;
use serde::Deserialize;

use super::utils::{self, get_json, non_empty};
use super::NewsSource;
use crate::classify;

pub const API_BASE: &str = "https://dev.to/api";

#[derive(Debug, Deserialize)]
struct DevToArticle {
    id: u64,
    title: String,
    url: String,
    description: Option<String>,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    public_reactions_count: u64,
    #[serde(default)]
    tag_list: TagList,
}

/// The listing endpoint sends tags as an array, single-article payloads as a comma list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagList {
    List(Vec<String>),
    Joined(String),
}

impl Default for TagList {
    fn default() -> Self {
        TagList::List(Vec::new())
    }
}

impl TagList {
    fn into_vec(self) -> Vec<String> {
        match self {
            TagList::List(tags) => tags,
            TagList::Joined(joined) => joined
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DevToSource {
    client: Client,
    api_base: String,
}

impl DevToSource {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, API_BASE)
    }

    pub fn with_endpoint(client: Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.to_string(),
        }
    }

    fn to_article(raw: DevToArticle) -> Article {
        let tags = raw.tag_list.into_vec();
        let mut article = Article::new(
            Source::DevTo,
            raw.id,
            raw.title,
            raw.url,
            raw.published_at.unwrap_or_else(Utc::now),
        );
        article.category = classify::categorize_tags(&tags);
        article.tags = tags;
        article.score = raw.public_reactions_count;
        let description = non_empty(raw.description);
        article.content = description.clone();
        article.excerpt = description;
        article
    }

    async fn list(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Vec<Article>> {
        let url = utils::parse_base(&self.api_base)?.join(endpoint)?;
        let raw: Vec<DevToArticle> = get_json(&self.client, url, query).await?;
        Ok(raw.into_iter().map(Self::to_article).collect())
    }
}

#[async_trait]
impl NewsSource for DevToSource {
    fn source(&self) -> Source {
        Source::DevTo
    }

    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Article>> {
        let mut articles = self
            .list("articles", &[("per_page", limit.to_string()), ("top", "1".to_string())])
            .await?;
        articles.truncate(limit);
        Ok(articles)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>> {
        let mut articles = self
            .list(
                "articles/search",
                &[("q", query.to_string()), ("per_page", limit.to_string())],
            )
            .await?;
        articles.truncate(limit);
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::Category;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> serde_json::Value {
        json!([
            {
                "id": 101,
                "title": "Fine-tuning small models",
                "url": "https://dev.to/someone/fine-tuning",
                "description": "Notes from a weekend of experiments",
                "published_at": "2024-03-02T08:30:00Z",
                "public_reactions_count": 87,
                "tag_list": ["machinelearning", "python"]
            },
            {
                "id": 102,
                "title": "My first week as a founder",
                "url": "https://dev.to/someone/founder",
                "description": "",
                "published_at": "2024-03-01T08:30:00Z",
                "public_reactions_count": 12,
                "tag_list": "startup, career"
            }
        ])
    }

    #[tokio::test]
    async fn test_fetch_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/articles"))
            .and(query_param("top", "1"))
            .and(query_param("per_page", "30"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload()))
            .expect(1)
            .mount(&server)
            .await;

        let source = DevToSource::with_endpoint(Client::new(), &server.uri());
        let articles = source.fetch_latest(30).await.unwrap();
        assert_eq!(articles.len(), 2);

        assert_eq!(articles[0].id, "devto-101");
        assert_eq!(articles[0].category, Category::Ai);
        assert_eq!(articles[0].score, 87);
        assert_eq!(articles[0].tags, vec!["machinelearning", "python"]);
        assert_eq!(articles[0].excerpt.as_deref(), Some("Notes from a weekend of experiments"));

        assert_eq!(articles[1].category, Category::Startup);
        assert_eq!(articles[1].tags, vec!["startup", "career"]);
        assert!(articles[1].content.is_none(), "empty description is dropped");
    }

    #[tokio::test]
    async fn test_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/articles/search"))
            .and(query_param("q", "models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload()))
            .mount(&server)
            .await;

        let source = DevToSource::with_endpoint(Client::new(), &server.uri());
        let articles = source.search("models", 1).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source, Source::DevTo);
    }
}
