//! Scrapes the public web preview of Telegram channels (`https://t.me/s/<channel>`).

use std::time::Duration;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use pulse_core::{Article, ChannelConfig, Error, Result, ScrapeResult, Source, TelegramPost};
use regex::Regex;
use reqwest::Client;

use crate::classify::dedup_tags;
use crate::html::{clean_text, truncate_chars};
use crate::logging::Logger;

pub const BASE_URL: &str = "https://t.me";

const TITLE_CHARS: usize = 100;
const EXCERPT_CHARS: usize = 200;
const KEY_TERMS: usize = 5;

lazy_static! {
    static ref MESSAGE_WRAP: Regex = Regex::new(r#"<div class="tgme_widget_message_wrap"#).unwrap();
    static ref MESSAGE_TEXT: Regex =
        Regex::new(r#"(?s)<div class="tgme_widget_message_text[^"]*"[^>]*>(.*?)</div>"#).unwrap();
    static ref MESSAGE_DATE: Regex = Regex::new(r#"<time[^>]*datetime="([^"]+)""#).unwrap();
    static ref MESSAGE_VIEWS: Regex =
        Regex::new(r#"<span class="tgme_widget_message_views">([^<]+)</span>"#).unwrap();
    static ref DATA_POST: Regex = Regex::new(r#"data-post="[^"/]+/(\d+)""#).unwrap();
    static ref HASHTAG: Regex = Regex::new(r"#([\w-]+)").unwrap();
}

/// Reads "1.2K", "3M", "15 430" style counters.
pub fn parse_views(raw: &str) -> u64 {
    let raw = raw.trim().replace([' ', ','], "");
    let (number, scale) = match raw.chars().last() {
        Some('K') | Some('k') => (&raw[..raw.len() - 1], 1_000.0),
        Some('M') | Some('m') => (&raw[..raw.len() - 1], 1_000_000.0),
        _ => (raw.as_str(), 1.0),
    };
    number
        .parse::<f64>()
        .map(|n| (n * scale).round() as u64)
        .unwrap_or(0)
}

/// Extracts up to `limit` posts from a channel preview page.
pub fn parse_posts(html: &str, limit: usize) -> Vec<TelegramPost> {
    let starts: Vec<usize> = MESSAGE_WRAP.find_iter(html).map(|m| m.start()).collect();
    let blocks = starts.iter().enumerate().map(|(i, &start)| {
        let end = starts.get(i + 1).copied().unwrap_or(html.len());
        &html[start..end]
    });

    let mut posts = Vec::new();
    for block in blocks {
        if posts.len() >= limit {
            break;
        }
        let Some(text) = MESSAGE_TEXT.captures(block).map(|c| clean_text(&c[1])) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let id = DATA_POST
            .captures(block)
            .and_then(|c| c[1].parse::<u64>().ok())
            .unwrap_or(posts.len() as u64 + 1);
        let date = MESSAGE_DATE
            .captures(block)
            .and_then(|c| DateTime::parse_from_rfc3339(&c[1]).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let views = MESSAGE_VIEWS
            .captures(block)
            .map(|c| parse_views(&c[1]))
            .unwrap_or(0);

        posts.push(TelegramPost { id, text, date, views });
    }
    posts
}

/// Hashtags first, then up to five longer words from the text.
pub fn extract_tags(text: &str) -> Vec<String> {
    let hashtags: Vec<String> = HASHTAG
        .captures_iter(text)
        .map(|c| c[1].to_lowercase())
        .collect();

    let key_terms = text
        .split_whitespace()
        .filter(|w| !w.starts_with('#'))
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.chars().count() > 4 && !hashtags.contains(w))
        .take(KEY_TERMS);

    dedup_tags(hashtags.iter().cloned().chain(key_terms))
}

pub fn post_title(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    truncate_chars(first_line, TITLE_CHARS)
}

pub fn to_articles(posts: &[TelegramPost], channel: &ChannelConfig) -> Vec<Article> {
    let username = channel.username.trim_start_matches('@');
    posts
        .iter()
        .map(|post| {
            let mut article = Article::new(
                Source::Telegram,
                post.id,
                post_title(&post.text),
                format!("{}/{}/{}", BASE_URL, username, post.id),
                post.date,
            );
            article.id = format!("{}_{}", username, post.id);
            article.content = Some(post.text.clone());
            article.excerpt = Some(truncate_chars(&post.text, EXCERPT_CHARS));
            article.category = channel.category;
            article.language = channel.language;
            article.score = post.views;
            article.tags = dedup_tags(
                channel
                    .tags
                    .iter()
                    .cloned()
                    .chain(extract_tags(&post.text)),
            );
            article.channel_username = Some(username.to_string());
            article
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct TelegramScraper {
    client: Client,
    base_url: String,
    delay: Duration,
}

impl TelegramScraper {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            delay: Duration::from_secs(1),
        }
    }

    /// Pause between channels in [`scrape_channels`](Self::scrape_channels).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn fetch_channel_html(&self, username: &str) -> Result<String> {
        let url = format!("{}/s/{}", self.base_url, username.trim_start_matches('@'));
        tracing::debug!("🌐 Trying URL: {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scraping(format!("Failed to fetch posts: {}", status)));
        }
        Ok(response.text().await?)
    }

    pub async fn get_channel_posts(&self, username: &str, limit: usize) -> Result<Vec<TelegramPost>> {
        let html = self.fetch_channel_html(username).await?;
        Ok(parse_posts(&html, limit))
    }

    /// Never fails; problems end up in `ScrapeResult::error`.
    pub async fn scrape_channel(&self, channel: &ChannelConfig) -> ScrapeResult {
        let log = Logger::new().with_prefix(format!("📺 @{}", channel.username));
        log.info(&format!("category {} · language {}", channel.category, channel.language));

        let posts = match self
            .get_channel_posts(&channel.username, channel.posts_per_scrape as usize)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                log.error(&format!("Error scraping channel: {}", e));
                return ScrapeResult::failed(channel, e.to_string());
            }
        };

        if posts.is_empty() {
            log.warn("No posts found");
            return ScrapeResult::failed(channel, "No posts found");
        }

        log.info(&format!("📝 Found {} posts", posts.len()));
        let articles = to_articles(&posts, channel);
        ScrapeResult {
            channel: channel.clone(),
            last_post_date: posts.first().map(|p| p.date),
            posts,
            articles,
            error: None,
        }
    }

    pub async fn scrape_channels(&self, channels: &[ChannelConfig]) -> Vec<ScrapeResult> {
        let mut results = Vec::with_capacity(channels.len());
        for (i, channel) in channels.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            results.push(self.scrape_channel(channel).await);
        }
        log_summary(&results);
        results
    }
}

pub fn log_summary(results: &[ScrapeResult]) {
    let log = Logger::new().with_prefix("📊".to_string());
    let total_posts: usize = results.iter().map(|r| r.posts.len()).sum();
    let total_articles: usize = results.iter().map(|r| r.articles.len()).sum();
    log.info(&format!("Scraping summary: {} posts, {} articles", total_posts, total_articles));

    for result in results {
        let mut line = format!(
            "@{}: {} posts, {} articles",
            result.channel.username,
            result.posts.len(),
            result.articles.len()
        );
        if let Some(date) = result.last_post_date {
            line.push_str(&format!(", latest {}", date.format("%Y-%m-%d")));
        }
        if let Some(first) = result.articles.first() {
            let preview = first.content.as_deref().unwrap_or_default();
            line.push_str(&format!(", preview \"{}...\"", truncate_chars(preview, 100)));
        }
        if let Some(error) = &result.error {
            line.push_str(&format!(", error: {}", error));
        }
        log.info(&line);
    }
}
