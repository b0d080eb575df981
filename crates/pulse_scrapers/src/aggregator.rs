use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use pulse_core::{Article, InferenceModel, NewsFilter, NewsPage, Sentiment};
use tracing::{debug, info, warn};

use crate::sources::NewsSource;

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Fans a request out to every news source and merges the answers into one page.
pub struct NewsAggregator {
    sources: Vec<Arc<dyn NewsSource>>,
    model: Option<Arc<dyn InferenceModel>>,
    batch_size: usize,
}

impl NewsAggregator {
    pub fn new(sources: Vec<Arc<dyn NewsSource>>) -> Self {
        Self {
            sources,
            model: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn InferenceModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn sources(&self) -> &[Arc<dyn NewsSource>] {
        &self.sources
    }

    pub async fn fetch_all(&self, filter: &NewsFilter, page: usize, limit: usize) -> NewsPage {
        let results = join_all(self.sources.iter().map(|source| async move {
            match source.fetch_latest(limit).await {
                Ok(articles) => {
                    debug!("📥 {} returned {} articles", source.source(), articles.len());
                    articles
                }
                Err(e) => {
                    warn!("Failed to fetch from {}: {}", source.source(), e);
                    Vec::new()
                }
            }
        }))
        .await;

        let mut articles = filter.apply(results.into_iter().flatten().collect());
        articles.sort_by(by_recency_then_score);
        info!("📰 {} articles after filtering", articles.len());
        self.finish(articles, page, limit).await
    }

    pub async fn search(&self, query: &str, filter: &NewsFilter, page: usize, limit: usize) -> NewsPage {
        let results = join_all(self.sources.iter().map(|source| async move {
            match source.search(query, limit).await {
                Ok(articles) => articles,
                Err(e) => {
                    warn!("Search on {} failed: {}", source.source(), e);
                    Vec::new()
                }
            }
        }))
        .await;

        let mut articles = filter.apply(results.into_iter().flatten().collect());
        articles.sort_by(by_score_then_recency);
        info!("🔍 {} articles match \"{}\"", articles.len(), query);
        self.finish(articles, page, limit).await
    }

    async fn finish(&self, articles: Vec<Article>, page: usize, limit: usize) -> NewsPage {
        let mut page = NewsPage::paginate(articles, page, limit);
        page.items = self.enrich(page.items).await;
        page
    }

    /// Adds summary, sentiment and topics, `batch_size` articles at a time.
    pub async fn enrich(&self, articles: Vec<Article>) -> Vec<Article> {
        let Some(model) = self.model.as_ref() else {
            return articles;
        };

        let mut enriched = Vec::with_capacity(articles.len());
        let mut pending = articles.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<Article> = pending.by_ref().take(self.batch_size).collect();
            let done = join_all(batch.into_iter().map(|article| enrich_article(model.as_ref(), article))).await;
            enriched.extend(done);
        }
        enriched
    }
}

async fn enrich_article(model: &dyn InferenceModel, mut article: Article) -> Article {
    if article.is_enriched() {
        return article;
    }
    let Some(text) = article.analysis_text().map(str::to_string) else {
        return article;
    };

    let (summary, sentiment, topics) = tokio::join!(
        model.summarize(&text),
        model.analyze_sentiment(&text),
        model.extract_topics(&text),
    );

    article.ai_summary = match summary {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!("🤖 Summary failed for {}: {}", article.id, e);
            None
        }
    };
    article.sentiment = Some(sentiment.unwrap_or_else(|e| {
        warn!("🤖 Sentiment failed for {}: {}", article.id, e);
        Sentiment::Neutral
    }));
    article.ai_topics = topics.unwrap_or_else(|e| {
        warn!("🤖 Topic extraction failed for {}: {}", article.id, e);
        Vec::new()
    });
    article
}

fn by_recency_then_score(a: &Article, b: &Article) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| b.score.cmp(&a.score))
}

fn by_score_then_recency(a: &Article, b: &Article) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.published_at.cmp(&a.published_at))
}
