use axum::{
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, NewsCache};

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/news", get(handlers::get_news))
        .route("/api/articles", get(handlers::list_articles).post(handlers::create_article))
        .route("/api/articles/:id", get(handlers::get_article))
        .route("/api/channels", get(handlers::list_channels))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use crate::{create_app, AppState};
    pub use pulse_core::{Article, Error, Result};
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use pulse_core::{Article, ArticleStorage, Result, Source};
    use pulse_scrapers::channels::active_channels;
    use pulse_scrapers::{NewsAggregator, NewsSource};
    use pulse_storage::MemoryStorage;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NewsSource for CountingSource {
        fn source(&self) -> Source {
            Source::HackerNews
        }

        async fn fetch_latest(&self, _limit: usize) -> Result<Vec<Article>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![article("1"), article("2")])
        }

        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<Article>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![article(query)])
        }
    }

    fn article(id: &str) -> Article {
        let mut a = Article::new(
            Source::HackerNews,
            id,
            format!("Story {}", id),
            format!("https://example.com/{}", id),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        );
        a.tags = vec!["rust".to_string()];
        a
    }

    fn app() -> (Router, Arc<AtomicUsize>, Arc<MemoryStorage>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source: Arc<dyn NewsSource> = Arc::new(CountingSource { calls: calls.clone() });
        let aggregator = Arc::new(NewsAggregator::new(vec![source]));
        let storage = Arc::new(MemoryStorage::new());
        let state = AppState::new(aggregator, storage.clone(), active_channels());
        (create_app(state), calls, storage)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_news_is_cached() {
        let (app, calls, _) = app();

        let (status, body) = send(&app, get("/api/news?limit=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["hasMore"], true);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        send(&app, get("/api/news?limit=1")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (_, body) = send(&app, get("/api/news?query=wasm")).await;
        assert_eq!(body["items"][0]["id"], "hn-wasm");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_news_rejects_bad_params() {
        let (app, _, _) = app();
        let (status, body) = send(&app, get("/api/news?sources=myspace")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid source: myspace");
    }

    #[tokio::test]
    async fn test_articles_roundtrip() {
        let (app, _, storage) = app();
        let mut post = article("99");
        post.source = Source::Telegram;
        post.id = "durov_99".to_string();

        let request = Request::builder()
            .method("POST")
            .uri("/api/articles")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "article": post, "channelUsername": "@Durov" }).to_string(),
            ))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["article"]["channelUsername"], "durov");
        assert_eq!(storage.list_channels().await.unwrap().len(), 1);

        let (status, body) = send(&app, get("/api/articles/durov_99")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Story 99");

        let (_, body) = send(&app, get("/api/articles?language=en&limit=5")).await;
        assert_eq!(body["articles"].as_array().unwrap().len(), 1);

        let (status, body) = send(&app, get("/api/articles/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Article not found: missing");
    }

    #[tokio::test]
    async fn test_unknown_channel_is_rejected() {
        let (app, _, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/articles")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "article": article("1"), "channelUsername": "nobody" }).to_string()))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut post = article("2");
        post.channel_username = Some("nobody".to_string());
        let request = Request::builder()
            .method("POST")
            .uri("/api/articles")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "article": post }).to_string()))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown channel: nobody");
    }

    #[tokio::test]
    async fn test_channels() {
        let (app, _, _) = app();
        let (_, body) = send(&app, get("/api/channels")).await;
        assert_eq!(body.as_array().unwrap().len(), 4);

        let (_, body) = send(&app, get("/api/channels?language=ru")).await;
        assert_eq!(body[0]["username"], "startupoftheday");
        assert_eq!(body[0]["postsPerScrape"], 10);
    }
}
