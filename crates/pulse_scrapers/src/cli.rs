use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use pulse_core::{
    ArticleStorage, Category, ChannelConfig, Error, NewsFilter, NewsPage, Result, ScrapeResult, Source,
};
use tracing::{info, warn};

use crate::aggregator::NewsAggregator;
use crate::channels::get_channel_config;
use crate::html::truncate_chars;
use crate::telegram::TelegramScraper;

/// Durations such as `90`, `30m`, `1h15m30s` or `1d`. A bare number is seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_number = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !current_number.is_empty() {
                let num = current_number
                    .parse::<u64>()
                    .map_err(|_| "Duration is too long".to_string())?;
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| "Duration is too long".to_string())?;
                current_number.clear();
                has_number = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Duration is too long".to_string())?;
            total_seconds = total_seconds
                .checked_add(num)
                .ok_or_else(|| "Duration is too long".to_string())?;
            has_number = true;
        }

        if !has_number {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be positive".to_string());
        }
        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Scrape Telegram channels and store their posts
    Telegram {
        /// A single channel username; all configured channels when omitted
        channel: Option<String>,
        /// Keep scraping with this pause between rounds (e.g. 1h, 30m, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// Fetch aggregated news from Hacker News, Dev.to and Reddit
    News {
        /// Search instead of listing the latest stories
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 30)]
        limit: usize,
        #[arg(long = "category")]
        categories: Vec<Category>,
        #[arg(long = "source")]
        sources: Vec<Source>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Everything a scrape command needs.
pub struct ScrapeContext {
    pub storage: Arc<dyn ArticleStorage>,
    pub aggregator: Arc<NewsAggregator>,
    pub telegram: TelegramScraper,
    pub channels: Vec<ChannelConfig>,
}

pub async fn handle_command(args: ScraperArgs, ctx: &ScrapeContext) -> Result<()> {
    match args.command {
        ScraperCommands::Telegram { channel, interval } => {
            let channels = select_channels(&ctx.channels, channel.as_deref())?;
            info!("🦗 Scraping {} channel(s)", channels.len());

            match interval {
                Some(HumanDuration(pause)) => loop {
                    info!("Starting scrape cycle");
                    if let Err(e) = scrape_and_store(ctx, &channels).await {
                        warn!("Error during scrape: {}", e);
                    }
                    info!("Waiting {}s before next scrape", pause.as_secs());
                    tokio::time::sleep(pause).await;
                },
                None => {
                    scrape_and_store(ctx, &channels).await?;
                }
            }
        }
        ScraperCommands::News {
            query,
            page,
            limit,
            categories,
            sources,
            tags,
            json,
        } => {
            let filter = NewsFilter {
                categories,
                sources,
                tags,
                ..Default::default()
            };
            let result = match query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
                Some(query) => ctx.aggregator.search(query, &filter, page, limit).await,
                None => ctx.aggregator.fetch_all(&filter, page, limit).await,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_page(&result);
            }
        }
    }
    Ok(())
}

fn select_channels(channels: &[ChannelConfig], username: Option<&str>) -> Result<Vec<ChannelConfig>> {
    match username {
        Some(username) => get_channel_config(channels, username)
            .cloned()
            .map(|c| vec![c])
            .ok_or_else(|| Error::NotFound(format!("Channel @{} is not configured", username.trim_start_matches('@')))),
        None => Ok(channels.to_vec()),
    }
}

async fn scrape_and_store(ctx: &ScrapeContext, channels: &[ChannelConfig]) -> Result<usize> {
    let results = ctx.telegram.scrape_channels(channels).await;
    store_results(ctx.storage.as_ref(), &results, Utc::now()).await
}

/// Saves every scraped article and stamps the channels. Returns the number of articles stored.
pub async fn store_results(storage: &dyn ArticleStorage, results: &[ScrapeResult], now: DateTime<Utc>) -> Result<usize> {
    let mut stored = 0;
    for result in results {
        storage.upsert_channel(&result.channel).await?;
        if result.error.is_some() {
            continue;
        }
        for article in &result.articles {
            match storage.save_article(article).await {
                Ok(()) => stored += 1,
                Err(e) => warn!("💾 Failed to store {}: {}", article.id, e),
            }
        }
        storage.mark_channel_scraped(&result.channel.username, now).await?;
    }
    info!("💾 Stored {} articles", stored);
    Ok(stored)
}

fn print_page(page: &NewsPage) {
    println!(
        "Page {} · {} of {} articles{}",
        page.page,
        page.items.len(),
        page.total,
        if page.has_more { " · more available" } else { "" }
    );
    for article in &page.items {
        println!(
            "[{}] {} ({} · {} · score {})",
            article.source,
            article.title,
            article.category,
            article.published_at.format("%Y-%m-%d %H:%M"),
            article.score
        );
        println!("    {}", article.url);
        if let Some(summary) = &article.ai_summary {
            println!("    {}", truncate_chars(summary, 160));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::active_channels;
    use chrono::TimeZone;
    use pulse_core::ArticleQuery;
    use pulse_storage::MemoryStorage;

    #[test]
    fn test_human_duration() {
        assert_eq!("90".parse::<HumanDuration>().unwrap().0, Duration::from_secs(90));
        assert_eq!("30m".parse::<HumanDuration>().unwrap().0, Duration::from_secs(1800));
        assert_eq!("1h15m30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(4530));
        assert_eq!("1d".parse::<HumanDuration>().unwrap().0, Duration::from_secs(86400));
        assert!("".parse::<HumanDuration>().is_err());
        assert!("2w".parse::<HumanDuration>().is_err());
        assert!("0s".parse::<HumanDuration>().is_err());
        assert!("213503982334602d".parse::<HumanDuration>().is_err());
        assert!("18446744073709551615s1s".parse::<HumanDuration>().is_err());
        assert!("99999999999999999999".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_select_channels() {
        let channels = active_channels();
        assert_eq!(select_channels(&channels, None).unwrap().len(), 4);
        assert_eq!(select_channels(&channels, Some("@huggingface")).unwrap()[0].username, "huggingface");
        assert!(matches!(select_channels(&channels, Some("nope")), Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_store_results() {
        let channels = active_channels();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let posts = vec![pulse_core::TelegramPost {
            id: 7,
            text: "Funding round closed for a new startup".to_string(),
            date: now,
            views: 42,
        }];
        let ok = ScrapeResult {
            channel: channels[2].clone(),
            articles: crate::telegram::to_articles(&posts, &channels[2]),
            last_post_date: Some(now),
            posts,
            error: None,
        };
        let failed = ScrapeResult::failed(&channels[0], "No posts found");

        let storage = MemoryStorage::new();
        let stored = store_results(&storage, &[ok, failed], now).await.unwrap();
        assert_eq!(stored, 1);

        let article = storage.get_article("startupoftheday_7").await.unwrap().unwrap();
        assert_eq!(article.category, Category::Startup);
        assert_eq!(storage.list_channels().await.unwrap().len(), 2);
        assert_eq!(storage.get_articles(&ArticleQuery::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_results_for_prefixed_channel_in_sqlite() {
        use pulse_storage::SQLiteStorage;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut channel = active_channels()[3].clone();
        channel.username = "@huggingface".to_string();
        write!(file, "{}", serde_json::to_string(&vec![channel]).unwrap()).unwrap();
        let channels = crate::channels::load_channels(file.path()).unwrap();
        assert_eq!(channels[0].username, "huggingface");

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let posts = vec![pulse_core::TelegramPost {
            id: 12,
            text: "New open model release on the hub".to_string(),
            date: now,
            views: 1200,
        }];
        let result = ScrapeResult {
            channel: channels[0].clone(),
            articles: crate::telegram::to_articles(&posts, &channels[0]),
            last_post_date: Some(now),
            posts,
            error: None,
        };

        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("pulse.db");
        let storage = SQLiteStorage::connect(db_path.to_str().unwrap()).await.unwrap();

        let stored = store_results(&storage, &[result], now).await.unwrap();
        assert_eq!(stored, 1);
        assert_eq!(storage.get_articles(&ArticleQuery::default()).await.unwrap().len(), 1);
        assert_eq!(storage.last_scraped("huggingface").await.unwrap(), Some(now));
    }
}
