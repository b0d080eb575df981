pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::InferenceModel;
pub use storage::ArticleStorage;
pub use types::{
    Article, ArticleQuery, Category, ChannelConfig, Language, NewsFilter, NewsPage, Quality,
    ScrapeResult, Sentiment, Source, TelegramPost, UpdateFrequency,
};
