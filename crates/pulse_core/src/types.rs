use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Where an article came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    HackerNews,
    DevTo,
    Reddit,
    Telegram,
}

impl Source {
    /// The polled news APIs, in fan-out order.
    pub fn news_sources() -> [Source; 3] {
        [Source::HackerNews, Source::DevTo, Source::Reddit]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::HackerNews => "hackernews",
            Source::DevTo => "devto",
            Source::Reddit => "reddit",
            Source::Telegram => "telegram",
        }
    }

    /// Prefix used to build synthetic article ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Source::HackerNews => "hn",
            Source::DevTo => "devto",
            Source::Reddit => "reddit",
            Source::Telegram => "telegram",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hackernews" | "hn" => Ok(Source::HackerNews),
            "devto" | "dev.to" => Ok(Source::DevTo),
            "reddit" => Ok(Source::Reddit),
            "telegram" => Ok(Source::Telegram),
            other => Err(Error::Config(format!("Unknown source: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "ai/ml", alias = "AI/ML")]
    Ai,
    Blockchain,
    #[serde(alias = "startups")]
    Startup,
    Security,
    #[serde(alias = "development")]
    Programming,
    Product,
    #[default]
    #[serde(alias = "tech")]
    Technology,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ai => "ai",
            Category::Blockchain => "blockchain",
            Category::Startup => "startup",
            Category::Security => "security",
            Category::Programming => "programming",
            Category::Product => "product",
            Category::Technology => "technology",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ai" | "ai/ml" | "ml" => Ok(Category::Ai),
            "blockchain" | "crypto" => Ok(Category::Blockchain),
            "startup" | "startups" => Ok(Category::Startup),
            "security" => Ok(Category::Security),
            "programming" | "development" => Ok(Category::Programming),
            "product" => Ok(Category::Product),
            "technology" | "tech" => Ok(Category::Technology),
            other => Err(Error::Config(format!("Unknown category: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ru" => Ok(Language::Ru),
            other => Err(Error::Config(format!("Unknown language: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Reads a one-word model reply. Anything unexpected counts as neutral.
    pub fn parse(reply: &str) -> Self {
        let word = reply
            .trim()
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        match word.as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// The article shape shared by every source adapter, the Telegram scraper and the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub url: String,
    #[serde(default)]
    pub category: Category,
    pub source: Source,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ai_topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

impl Article {
    /// Builds a bare article with the synthetic `<prefix>-<native id>` key.
    pub fn new(source: Source, native_id: impl fmt::Display, title: impl Into<String>, url: impl Into<String>, published_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("{}-{}", source.id_prefix(), native_id),
            title: title.into(),
            content: None,
            excerpt: None,
            url: url.into(),
            category: Category::default(),
            source,
            published_at,
            score: 0,
            language: Language::default(),
            tags: Vec::new(),
            channel_username: None,
            ai_summary: None,
            ai_topics: Vec::new(),
            sentiment: None,
        }
    }

    /// Text handed to the enrichment model: content, else excerpt.
    pub fn analysis_text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| self.excerpt.as_deref().filter(|e| !e.trim().is_empty()))
    }

    pub fn is_enriched(&self) -> bool {
        self.ai_summary.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateFrequency {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    High,
    Medium,
    Low,
}

impl UpdateFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateFrequency::Daily => "daily",
            UpdateFrequency::Weekly => "weekly",
            UpdateFrequency::Monthly => "monthly",
        }
    }
}

impl FromStr for UpdateFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(UpdateFrequency::Daily),
            "weekly" => Ok(UpdateFrequency::Weekly),
            "monthly" => Ok(UpdateFrequency::Monthly),
            other => Err(Error::Config(format!("Unknown update frequency: {}", other))),
        }
    }
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Low => "low",
        }
    }
}

impl FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Quality::High),
            "medium" => Ok(Quality::Medium),
            "low" => Ok(Quality::Low),
            other => Err(Error::Config(format!("Unknown quality: {}", other))),
        }
    }
}

pub const MIN_POSTS_PER_SCRAPE: u32 = 1;
pub const MAX_POSTS_PER_SCRAPE: u32 = 50;

/// A public Telegram channel to scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub username: String,
    pub name: String,
    pub category: Category,
    pub language: Language,
    pub posts_per_scrape: u32,
    pub description: String,
    pub tags: Vec<String>,
    pub update_frequency: UpdateFrequency,
    pub quality: Quality,
}

impl ChannelConfig {
    /// Strips surrounding whitespace and a leading `@` from the username.
    pub fn normalize(&mut self) {
        let username = self.username.trim().trim_start_matches('@').to_string();
        self.username = username;
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().trim_start_matches('@').is_empty() {
            return Err(Error::Config("Channel username must not be empty".to_string()));
        }
        if !(MIN_POSTS_PER_SCRAPE..=MAX_POSTS_PER_SCRAPE).contains(&self.posts_per_scrape) {
            return Err(Error::Config(format!(
                "postsPerScrape for @{} must be between {} and {}, got {}",
                self.username, MIN_POSTS_PER_SCRAPE, MAX_POSTS_PER_SCRAPE, self.posts_per_scrape
            )));
        }
        Ok(())
    }
}

/// In-memory query applied to fetched collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsFilter {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub search_query: Option<String>,
}

impl NewsFilter {
    pub fn matches(&self, article: &Article) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&article.category) {
            return false;
        }
        if !self.sources.is_empty() && !self.sources.contains(&article.source) {
            return false;
        }
        if let Some(from) = self.date_from {
            if article.published_at < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if article.published_at > to {
                return false;
            }
        }
        if !self.tags.is_empty() && !article.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        if let Some(query) = self.search_query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let haystack = format!(
                "{} {} {} {}",
                article.title,
                article.content.as_deref().unwrap_or_default(),
                article.excerpt.as_deref().unwrap_or_default(),
                article.tags.join(" ")
            )
            .to_lowercase();
            return haystack.contains(&query.to_lowercase());
        }
        true
    }

    pub fn apply(&self, articles: Vec<Article>) -> Vec<Article> {
        articles.into_iter().filter(|a| self.matches(a)).collect()
    }
}

/// One page of aggregated news.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsPage {
    pub items: Vec<Article>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
}

impl NewsPage {
    pub fn empty(page: usize, limit: usize) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            limit,
            has_more: false,
        }
    }

    /// Slices a sorted collection. Pages are 1-based; page 0 is read as page 1.
    pub fn paginate(articles: Vec<Article>, page: usize, limit: usize) -> Self {
        let page = page.max(1);
        let total = articles.len();
        let start = (page - 1).saturating_mul(limit);
        let end = start.saturating_add(limit);
        let items = articles.into_iter().skip(start).take(limit).collect();
        Self {
            items,
            total,
            page,
            limit,
            has_more: end < total,
        }
    }
}

/// Listing query for persisted articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleQuery {
    pub category: Option<Category>,
    pub language: Option<Language>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            category: None,
            language: None,
            limit: 10,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramPost {
    pub id: u64,
    pub text: String,
    pub date: DateTime<Utc>,
    pub views: u64,
}

/// Outcome of scraping one channel. Failures are reported, not raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub channel: ChannelConfig,
    pub posts: Vec<TelegramPost>,
    pub articles: Vec<Article>,
    pub last_post_date: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ScrapeResult {
    pub fn failed(channel: &ChannelConfig, error: impl Into<String>) -> Self {
        Self {
            channel: channel.clone(),
            posts: Vec::new(),
            articles: Vec::new(),
            last_post_date: None,
            error: Some(error.into()),
        }
    }
}
