use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use pulse_core::{Article, ArticleQuery, ArticleStorage, Category, ChannelConfig, Language, Result, Source};
use pulse_scrapers::channels::{active_channels, load_channels};
use pulse_scrapers::{
    default_client, default_sources, handle_command, init_logging, NewsAggregator, ScrapeContext, ScraperArgs,
    TelegramScraper,
};
use pulse_web::{create_app, AppState};
use tracing::{info, warn};

const HEALTHCHECK_ID: &str = "pulse-healthcheck";

async fn check_storage(storage: &Arc<dyn ArticleStorage>, storage_type: &str) -> Result<()> {
    let probe = Article {
        id: HEALTHCHECK_ID.to_string(),
        ..Article::new(
            Source::HackerNews,
            0,
            "Storage health check",
            "https://example.com/healthcheck",
            Utc::now(),
        )
    };

    storage.save_article(&probe).await?;

    match storage.get_article(HEALTHCHECK_ID).await? {
        Some(stored) if stored.title == probe.title => {}
        _ => {
            return Err(pulse_core::Error::Storage(
                "Failed to retrieve health check article".to_string(),
            ))
        }
    }

    info!("🏦 Storage backend initialized successfully (using {})", storage_type);

    if let Err(e) = storage.delete_article(HEALTHCHECK_ID).await {
        warn!("⚠️ Failed to clean up health check article: {}", e);
    }

    Ok(())
}

async fn check_storage_with_retry(
    storage: &Arc<dyn ArticleStorage>,
    storage_type: &str,
    max_retries: u32,
    timeout: Duration,
) -> Result<()> {
    let mut retries = 0;
    let mut last_error = None;

    while retries < max_retries {
        let error = match tokio::time::timeout(timeout, check_storage(storage, storage_type)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(elapsed) => pulse_core::Error::Storage(format!("Storage health check timed out: {}", elapsed)),
        };
        last_error = Some(error);
        retries += 1;
        if retries < max_retries {
            info!("Storage health check failed, retrying {}/{}...", retries, max_retries);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| {
        pulse_core::Error::Storage("Storage health check failed after all retries".to_string())
    }))
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Aggregates tech news and Telegram channels", long_about = None)]
struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, env = "PULSE_STORAGE", default_value = "memory", global = true)]
    storage: String,
    /// SQLite file or `sqlite:` URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,
    /// Enrichment model: dummy, gemini, openai or deepseek (optionally `name:model-id`)
    #[arg(long, env = "PULSE_MODEL", default_value = "dummy", global = true)]
    model: String,
    #[arg(long, env = "PULSE_MODEL_URL", global = true)]
    model_url: Option<String>,
    #[arg(long, env = "PULSE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
    /// JSON file with channel configs, replacing the built-in list
    #[arg(long, env = "PULSE_CHANNELS", global = true)]
    channels: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape Telegram channels or fetch aggregated news
    Scrape(ScraperArgs),
    /// List configured Telegram channels
    Channels {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        language: Option<Language>,
    },
    /// List stored articles, newest first
    Articles {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        language: Option<Language>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Create the database schema and register the configured channels
    InitDb,
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "PULSE_ADDR", default_value = "0.0.0.0:3000")]
        addr: String,
    },
}

fn load_env_files() {
    for file in [".env.local", ".env"] {
        if dotenvy::from_filename(file).is_ok() {
            eprintln!("Loaded environment from {}", file);
        }
    }
}

fn print_channels(channels: &[ChannelConfig]) {
    for channel in channels {
        println!(
            "@{} - {} [{} · {} · {} posts]",
            channel.username, channel.name, channel.category, channel.language, channel.posts_per_scrape
        );
        if !channel.description.is_empty() {
            println!("    {}", channel.description);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_files();
    let cli = Cli::parse();
    init_logging("info");

    let channels = match &cli.channels {
        Some(path) => {
            let channels = load_channels(path)?;
            info!("📺 Loaded {} channels from {}", channels.len(), path.display());
            channels
        }
        None => active_channels(),
    };

    if let Commands::Channels { category, language } = &cli.command {
        let selected: Vec<ChannelConfig> = channels
            .iter()
            .filter(|c| category.map_or(true, |category| c.category == category))
            .filter(|c| language.map_or(true, |language| c.language == language))
            .cloned()
            .collect();
        print_channels(&selected);
        return Ok(());
    }

    info!("💾 Checking storage connection...");
    let storage = pulse_storage::create_storage(&cli.storage, cli.database_url.as_deref()).await?;
    check_storage_with_retry(&storage, &cli.storage, 3, Duration::from_secs(10)).await?;

    let config = pulse_inference::Config {
        model_name: Some(cli.model.clone()),
        api_key: cli.api_key.clone(),
        model_url: cli.model_url.clone(),
    };
    let model = pulse_inference::create_model(Some(config)).await?;

    let client = default_client()?;
    let aggregator = Arc::new(NewsAggregator::new(default_sources(&client)).with_model(model));

    match cli.command {
        Commands::Scrape(args) => {
            let ctx = ScrapeContext {
                storage,
                aggregator,
                telegram: TelegramScraper::new(client),
                channels,
            };
            handle_command(args, &ctx).await?;
        }
        Commands::Articles {
            category,
            language,
            limit,
            offset,
        } => {
            let query = ArticleQuery {
                category,
                language,
                limit,
                offset,
            };
            let articles = storage.get_articles(&query).await?;
            if articles.is_empty() {
                println!("No articles stored");
            }
            for article in articles {
                println!(
                    "{} · {} · {}",
                    article.published_at.format("%Y-%m-%d %H:%M"),
                    article.id,
                    article.title
                );
                println!("    {}", article.url);
            }
        }
        Commands::InitDb => {
            for channel in &channels {
                storage.upsert_channel(channel).await?;
            }
            info!("✨ Database ready with {} channels (using {})", channels.len(), cli.storage);
        }
        Commands::Serve { addr } => {
            let state = AppState::new(aggregator, storage, channels);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("🌐 Listening on http://{}", listener.local_addr()?);
            axum::serve(listener, create_app(state)).await?;
        }
        Commands::Channels { .. } => unreachable!("handled before storage setup"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_scrapers::ScraperCommands;
    use pulse_storage::MemoryStorage;

    #[tokio::test]
    async fn test_check_storage_leaves_no_probe() {
        let storage: Arc<dyn ArticleStorage> = Arc::new(MemoryStorage::new());
        check_storage_with_retry(&storage, "memory", 1, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(storage.get_article(HEALTHCHECK_ID).await.unwrap().is_none());
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "pulse",
            "--storage",
            "sqlite",
            "scrape",
            "telegram",
            "durov",
            "--interval",
            "1h30m",
        ])
        .unwrap();
        assert_eq!(cli.storage, "sqlite");
        match cli.command {
            Commands::Scrape(ScraperArgs {
                command: ScraperCommands::Telegram { channel, interval },
            }) => {
                assert_eq!(channel.as_deref(), Some("durov"));
                assert_eq!(interval.unwrap().0, Duration::from_secs(5400));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from([
            "pulse", "scrape", "news", "--category", "ai", "--category", "security", "--source", "hn", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Scrape(ScraperArgs {
                command: ScraperCommands::News { categories, sources, json, .. },
            }) => {
                assert_eq!(categories, vec![Category::Ai, Category::Security]);
                assert_eq!(sources, vec![Source::HackerNews]);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Cli::try_parse_from(["pulse", "articles", "--category", "gossip"]).is_err());
    }
}
