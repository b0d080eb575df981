pub mod aggregator;
pub mod channels;
pub mod classify;
pub mod cli;
pub mod html;
pub mod logging;
pub mod sources;
pub mod telegram;

pub use aggregator::NewsAggregator;
pub use cli::{handle_command, HumanDuration, ScrapeContext, ScraperArgs, ScraperCommands};
pub use logging::{init_logging, Logger};
pub use sources::{default_client, default_sources, NewsSource};
pub use telegram::TelegramScraper;

pub mod prelude {
    pub use super::sources::NewsSource;
    pub use super::{NewsAggregator, TelegramScraper};
    pub use pulse_core::{Article, ChannelConfig, Error, NewsFilter, NewsPage, Result};
}
