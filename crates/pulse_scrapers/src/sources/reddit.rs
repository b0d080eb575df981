use async_trait::async_trait;
use futures::future::join_all;
use pulse_core::{Article, Result, Source};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::utils::{self, from_epoch, get_json, non_empty};
use super::NewsSource;
use crate::classify;
use crate::html::truncate_chars;

pub const API_BASE: &str = "https://www.reddit.com";
pub const SUBREDDITS: &[&str] = &["technology", "programming", "artificial", "startups", "MachineLearning"];

const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: String,
    url: String,
    subreddit: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    score: i64,
    created_utc: f64,
    link_flair_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RedditSource {
    client: Client,
    api_base: String,
    subreddits: Vec<String>,
}

impl RedditSource {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, API_BASE)
    }

    pub fn with_endpoint(client: Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.to_string(),
            subreddits: SUBREDDITS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_subreddits(mut self, subreddits: Vec<String>) -> Self {
        self.subreddits = subreddits;
        self
    }

    fn to_article(post: Post, fallback_subreddit: &str) -> Article {
        let subreddit = post.subreddit.unwrap_or_else(|| fallback_subreddit.to_string());
        let mut article = Article::new(
            Source::Reddit,
            &post.id,
            post.title,
            post.url,
            from_epoch(post.created_utc as i64),
        );
        article.category = classify::categorize_reddit(&article.title, &subreddit);
        article.tags = classify::extract_reddit_tags(&article.title, &subreddit, post.link_flair_text.as_deref());
        article.score = post.score.max(0) as u64;
        article.content = non_empty(post.selftext);
        article.excerpt = article.content.as_deref().map(|c| truncate_chars(c, EXCERPT_CHARS));
        article
    }

    fn listing_posts(listing: Listing, fallback_subreddit: &str) -> Vec<Article> {
        listing
            .data
            .children
            .into_iter()
            .map(|child| Self::to_article(child.data, fallback_subreddit))
            .collect()
    }

    async fn top_of(&self, subreddit: &str, per_subreddit: usize) -> Result<Vec<Article>> {
        let url = utils::parse_base(&self.api_base)?.join(&format!("r/{}/top.json", subreddit))?;
        let listing: Listing = get_json(
            &self.client,
            url,
            &[("limit", per_subreddit.to_string()), ("t", "day".to_string())],
        )
        .await?;
        Ok(Self::listing_posts(listing, subreddit))
    }
}

#[async_trait]
impl NewsSource for RedditSource {
    fn source(&self) -> Source {
        Source::Reddit
    }

    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Article>> {
        if self.subreddits.is_empty() {
            return Ok(Vec::new());
        }
        let per_subreddit = limit.div_ceil(self.subreddits.len());

        let results = join_all(self.subreddits.iter().map(|sub| async move {
            match self.top_of(sub, per_subreddit).await {
                Ok(posts) => posts,
                Err(e) => {
                    warn!("Failed to fetch posts from r/{}: {}", sub, e);
                    Vec::new()
                }
            }
        }))
        .await;

        let mut posts: Vec<Article> = results.into_iter().flatten().collect();
        posts.sort_by(|a, b| b.score.cmp(&a.score));
        posts.truncate(limit);
        Ok(posts)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>> {
        let url = utils::parse_base(&self.api_base)?.join("search.json")?;
        let listing: Listing = get_json(
            &self.client,
            url,
            &[
                ("q", query.to_string()),
                ("sort", "relevance".to_string()),
                ("t", "month".to_string()),
                ("limit", limit.to_string()),
                ("restrict_sr", "on".to_string()),
                ("subreddit", self.subreddits.join("+")),
            ],
        )
        .await?;
        let mut posts = Self::listing_posts(listing, "technology");
        posts.truncate(limit);
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::Category;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing(posts: serde_json::Value) -> serde_json::Value {
        json!({ "data": { "children": posts } })
    }

    fn post(id: &str, title: &str, score: i64, is_self: bool) -> serde_json::Value {
        json!({
            "kind": "t3",
            "data": {
                "id": id,
                "title": title,
                "url": format!("https://example.com/{}", id),
                "selftext": "",
                "is_self": is_self,
                "score": score,
                "created_utc": 1_700_000_000.0,
                "link_flair_text": null
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_latest_merges_subreddits_by_score() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/programming/top.json"))
            .and(query_param("t", "day"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(json!([
                post("a1", "Writing a compiler", 40, false),
                post("a2", "Weekly discussion thread", 900, true),
            ]))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/startups/top.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(json!([
                post("b1", "We just closed our seed round", 75, false),
                post("b2", "Pricing lessons", 10, false),
            ]))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/broken/top.json"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let source = RedditSource::with_endpoint(Client::new(), &server.uri()).with_subreddits(vec![
            "programming".to_string(),
            "startups".to_string(),
            "broken".to_string(),
        ]);
        let articles = source.fetch_latest(5).await.unwrap();

        let ids: Vec<&str> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["reddit-a2", "reddit-b1", "reddit-a1", "reddit-b2"]);
        assert_eq!(articles[1].category, Category::Startup);
        assert_eq!(articles[1].tags[0], "startups");
        assert_eq!(articles[2].category, Category::Programming);
    }

    #[tokio::test]
    async fn test_search_is_restricted_to_subreddits() {
        let server = MockServer::start().await;
        let mut with_text = post("c1", "AI agents in production", 5, false);
        with_text["data"]["subreddit"] = json!("MachineLearning");
        with_text["data"]["selftext"] = json!("Long write-up ".repeat(30));
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "agents"))
            .and(query_param("restrict_sr", "on"))
            .and(query_param("subreddit", "technology+programming+artificial+startups+MachineLearning"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(json!([
                with_text,
                post("c2", "Self post", 3, true),
            ]))))
            .mount(&server)
            .await;

        let source = RedditSource::with_endpoint(Client::new(), &server.uri());
        let articles = source.search("agents", 30).await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].category, Category::Ai);
        assert_eq!(articles[0].tags[0], "machinelearning");
        assert_eq!(articles[0].excerpt.as_ref().unwrap().chars().count(), 200);
        assert_eq!(articles[1].id, "reddit-c2");
        assert!(articles[1].excerpt.is_none());
    }
}
