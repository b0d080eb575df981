use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use pulse_core::{Article, ArticleQuery, Category, ChannelConfig, Language, NewsFilter, NewsPage, Source};
use pulse_scrapers::channels::get_channel_config;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const DEFAULT_NEWS_LIMIT: usize = 30;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsParams {
    pub query: Option<String>,
    pub categories: Option<String>,
    pub sources: Option<String>,
    pub tags: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A validated `/api/news` request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsRequest {
    pub query: Option<String>,
    pub filter: NewsFilter,
    pub page: usize,
    pub limit: usize,
}

impl NewsRequest {
    /// Same request, same key, whatever the parameter order or list order.
    pub fn cache_key(&self) -> String {
        fn joined<T: ToString>(items: &[T]) -> String {
            let mut items: Vec<String> = items.iter().map(|i| i.to_string()).collect();
            items.sort();
            items.join(",")
        }
        let date = |d: Option<DateTime<Utc>>| d.map(|d| d.to_rfc3339()).unwrap_or_default();

        format!(
            "query={}&categories={}&sources={}&tags={}&startDate={}&endDate={}&page={}&limit={}",
            self.query.as_deref().unwrap_or_default().to_lowercase(),
            joined(&self.filter.categories),
            joined(&self.filter.sources),
            joined(&self.filter.tags),
            date(self.filter.date_from),
            date(self.filter.date_to),
            self.page,
            self.limit
        )
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_list<T>(raw: Option<&str>, what: &str) -> ApiResult<Vec<T>>
where
    T: FromStr,
{
    non_empty(raw)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| {
                    item.parse::<T>()
                        .map_err(|_| ApiError::BadRequest(format!("Invalid {}: {}", what, item)))
                })
                .collect()
        })
        .unwrap_or_else(|| Ok(Vec::new()))
}

fn parse_number(raw: Option<&str>, what: &str, default: usize) -> ApiResult<usize> {
    match non_empty(raw) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::BadRequest(format!("Invalid {}: {}", what, raw))),
        None => Ok(default),
    }
}

/// RFC 3339 timestamps or plain `YYYY-MM-DD` dates; a plain end date covers the whole day.
fn parse_date(raw: Option<&str>, what: &str, end_of_day: bool) -> ApiResult<Option<DateTime<Utc>>> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(date.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid {}: {}", what, raw)))?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .unwrap_or_default();
    Ok(Some(date.and_time(time).and_utc()))
}

pub fn parse_news_params(params: &NewsParams) -> ApiResult<NewsRequest> {
    let filter = NewsFilter {
        categories: parse_list::<Category>(params.categories.as_deref(), "category")?,
        sources: parse_list::<Source>(params.sources.as_deref(), "source")?,
        tags: parse_list::<String>(params.tags.as_deref(), "tag")?,
        date_from: parse_date(params.start_date.as_deref(), "startDate", false)?,
        date_to: parse_date(params.end_date.as_deref(), "endDate", true)?,
        search_query: None,
    };

    Ok(NewsRequest {
        query: non_empty(params.query.as_deref()).map(str::to_string),
        filter,
        page: parse_number(params.page.as_deref(), "page", 1)?.max(1),
        limit: parse_number(params.limit.as_deref(), "limit", DEFAULT_NEWS_LIMIT)?.clamp(1, MAX_LIMIT),
    })
}

pub async fn get_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsParams>,
) -> ApiResult<Json<NewsPage>> {
    let request = parse_news_params(&params)?;
    let key = request.cache_key();

    if let Some(page) = state.cache.get(&key).await {
        debug!("📦 Cache hit for {}", key);
        return Ok(Json(page));
    }

    let page = match request.query.as_deref() {
        Some(query) => {
            state
                .aggregator
                .search(query, &request.filter, request.page, request.limit)
                .await
        }
        None => {
            state
                .aggregator
                .fetch_all(&request.filter, request.page, request.limit)
                .await
        }
    };
    info!("📰 Serving {} of {} articles", page.items.len(), page.total);

    state.cache.insert(key, page.clone()).await;
    Ok(Json(page))
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticlesParams {
    pub category: Option<String>,
    pub language: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ArticlesParams>,
) -> ApiResult<Json<Value>> {
    let defaults = ArticleQuery::default();
    let query = ArticleQuery {
        category: parse_one::<Category>(params.category.as_deref(), "category")?,
        language: parse_one::<Language>(params.language.as_deref(), "language")?,
        limit: parse_number(params.limit.as_deref(), "limit", defaults.limit)?.clamp(1, MAX_LIMIT),
        offset: parse_number(params.offset.as_deref(), "offset", defaults.offset)?,
    };

    let articles = state.storage.get_articles(&query).await?;
    Ok(Json(json!({ "articles": articles })))
}

fn parse_one<T: FromStr>(raw: Option<&str>, what: &str) -> ApiResult<Option<T>> {
    non_empty(raw)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid {}: {}", what, raw)))
        })
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    pub article: Article,
    pub channel_username: Option<String>,
}

pub async fn create_article(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateArticleRequest>,
) -> ApiResult<Json<Value>> {
    let mut article = request.article;

    let username = non_empty(request.channel_username.as_deref())
        .or_else(|| non_empty(article.channel_username.as_deref()))
        .map(str::to_string);
    if let Some(username) = username {
        let channel = get_channel_config(&state.channels, &username).ok_or_else(|| {
            ApiError::BadRequest(format!("Unknown channel: {}", username.trim_start_matches('@')))
        })?;
        state.storage.upsert_channel(channel).await?;
        article.channel_username = Some(channel.username.clone());
    }

    state.storage.save_article(&article).await?;
    info!("💾 Saved article {}", article.id);
    Ok(Json(json!({ "article": article })))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Article>> {
    state
        .storage
        .get_article(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Article not found: {}", id)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelsParams {
    pub category: Option<String>,
    pub language: Option<String>,
}

pub async fn list_channels(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChannelsParams>,
) -> ApiResult<Json<Vec<ChannelConfig>>> {
    let category = parse_one::<Category>(params.category.as_deref(), "category")?;
    let language = parse_one::<Language>(params.language.as_deref(), "language")?;

    let channels = state
        .channels
        .iter()
        .filter(|c| category.map_or(true, |category| c.category == category))
        .filter(|c| language.map_or(true, |language| c.language == language))
        .cloned()
        .collect();
    Ok(Json(channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(pairs: &[(&str, &str)]) -> NewsParams {
        let mut params = NewsParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "query" => params.query = value,
                "categories" => params.categories = value,
                "sources" => params.sources = value,
                "tags" => params.tags = value,
                "startDate" => params.start_date = value,
                "endDate" => params.end_date = value,
                "page" => params.page = value,
                "limit" => params.limit = value,
                _ => unreachable!(),
            }
        }
        params
    }

    #[test]
    fn test_parse_news_params_defaults() {
        let request = parse_news_params(&NewsParams::default()).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, DEFAULT_NEWS_LIMIT);
        assert!(request.query.is_none());
        assert_eq!(request.filter, NewsFilter::default());
    }

    #[test]
    fn test_parse_news_params() {
        let request = parse_news_params(&params(&[
            ("query", " rust "),
            ("categories", "ai, startups"),
            ("sources", "hackernews,reddit"),
            ("tags", "rust,,llm"),
            ("startDate", "2024-03-01"),
            ("endDate", "2024-03-02T10:00:00Z"),
            ("page", "0"),
            ("limit", "500"),
        ]))
        .unwrap();

        assert_eq!(request.query.as_deref(), Some("rust"));
        assert_eq!(request.filter.categories, vec![Category::Ai, Category::Startup]);
        assert_eq!(request.filter.sources, vec![Source::HackerNews, Source::Reddit]);
        assert_eq!(request.filter.tags, vec!["rust", "llm"]);
        assert_eq!(request.filter.date_from, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
        assert_eq!(request.filter.date_to, Some(Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap()));
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, MAX_LIMIT);
    }

    #[test]
    fn test_parse_news_params_rejects_garbage() {
        assert!(matches!(parse_news_params(&params(&[("categories", "gossip")])), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_news_params(&params(&[("page", "two")])), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_news_params(&params(&[("endDate", "yesterday")])), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_cache_key_is_order_insensitive() {
        let a = parse_news_params(&params(&[("categories", "ai,security"), ("tags", "b,a")])).unwrap();
        let b = parse_news_params(&params(&[("tags", "a,b"), ("categories", "security,ai")])).unwrap();
        let c = parse_news_params(&params(&[("categories", "ai"), ("page", "2")])).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }
}
