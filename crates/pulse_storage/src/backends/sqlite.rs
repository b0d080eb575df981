use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{
    Article, ArticleQuery, ArticleStorage, ChannelConfig, Error, Result, Sentiment,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::info;

pub const DEFAULT_PATH: &str = "articles.db";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS channels (
        username TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        language TEXT NOT NULL,
        posts_per_scrape INTEGER NOT NULL DEFAULT 10,
        description TEXT NOT NULL DEFAULT '',
        tags TEXT NOT NULL DEFAULT '[]',
        update_frequency TEXT NOT NULL,
        quality TEXT NOT NULL,
        last_scraped TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT,
        excerpt TEXT,
        url TEXT NOT NULL,
        category TEXT NOT NULL,
        source TEXT NOT NULL,
        publish_date TEXT NOT NULL,
        score INTEGER NOT NULL DEFAULT 0,
        language TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        channel_username TEXT REFERENCES channels(username),
        ai_summary TEXT,
        ai_topics TEXT NOT NULL DEFAULT '[]',
        sentiment TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_publish_date ON articles(publish_date DESC)",
    "CREATE INDEX IF NOT EXISTS idx_articles_category_language ON articles(category, language)",
];

fn db_error(context: &str) -> impl Fn(sqlx::Error) -> Error + '_ {
    move |e| Error::Database(format!("{}: {}", context, e))
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {}: {}", raw, e)))
}

pub struct SQLiteStorage {
    pool: SqlitePool,
}

impl SQLiteStorage {
    /// Accepts a `sqlite:` URL or a plain file path; the file is created when missing.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = if url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(url).map_err(db_error("Invalid database URL"))?
        } else {
            let path = Path::new(url);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            SqliteConnectOptions::new().filename(path)
        };
        let options = options.create_if_missing(true).foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    pub async fn migrate(&self) -> Result<()> {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }
        info!("🗄️ Applied {} migrations", MIGRATIONS.len());
        Ok(())
    }

    fn row_to_article(row: &SqliteRow) -> Result<Article> {
        let get = |column: &str| -> Result<String> {
            row.try_get::<String, _>(column).map_err(db_error("Failed to read article"))
        };
        let optional = |column: &str| -> Result<Option<String>> {
            row.try_get::<Option<String>, _>(column).map_err(db_error("Failed to read article"))
        };

        Ok(Article {
            id: get("id")?,
            title: get("title")?,
            content: optional("content")?,
            excerpt: optional("excerpt")?,
            url: get("url")?,
            category: get("category")?.parse()?,
            source: get("source")?.parse()?,
            published_at: parse_date(&get("publish_date")?)?,
            score: row
                .try_get::<i64, _>("score")
                .map_err(db_error("Failed to read article"))?
                .max(0) as u64,
            language: get("language")?.parse()?,
            tags: serde_json::from_str(&get("tags")?)?,
            channel_username: optional("channel_username")?,
            ai_summary: optional("ai_summary")?,
            ai_topics: serde_json::from_str(&get("ai_topics")?)?,
            sentiment: optional("sentiment")?.as_deref().map(Sentiment::parse),
        })
    }

    fn row_to_channel(row: &SqliteRow) -> Result<ChannelConfig> {
        let get = |column: &str| -> Result<String> {
            row.try_get::<String, _>(column).map_err(db_error("Failed to read channel"))
        };

        Ok(ChannelConfig {
            username: get("username")?,
            name: get("name")?,
            category: get("category")?.parse()?,
            language: get("language")?.parse()?,
            posts_per_scrape: row
                .try_get::<i64, _>("posts_per_scrape")
                .map_err(db_error("Failed to read channel"))? as u32,
            description: get("description")?,
            tags: serde_json::from_str(&get("tags")?)?,
            update_frequency: get("update_frequency")?.parse()?,
            quality: get("quality")?.parse()?,
        })
    }

    pub async fn last_scraped(&self, username: &str) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<Option<String>> = sqlx::query_scalar("SELECT last_scraped FROM channels WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to read channel"))?;
        raw.flatten().as_deref().map(parse_date).transpose()
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn save_article(&self, article: &Article) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO articles
            (id, title, content, excerpt, url, category, source, publish_date, score, language,
             tags, channel_username, ai_summary, ai_topics, sentiment, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                excerpt = excluded.excerpt,
                category = excluded.category,
                score = excluded.score,
                tags = excluded.tags,
                ai_summary = excluded.ai_summary,
                ai_topics = excluded.ai_topics,
                sentiment = excluded.sentiment,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(article.content.as_deref())
        .bind(article.excerpt.as_deref())
        .bind(&article.url)
        .bind(article.category.as_str())
        .bind(article.source.as_str())
        .bind(article.published_at.to_rfc3339())
        .bind(article.score as i64)
        .bind(article.language.as_str())
        .bind(serde_json::to_string(&article.tags)?)
        .bind(article.channel_username.as_deref())
        .bind(article.ai_summary.as_deref())
        .bind(serde_json::to_string(&article.ai_topics)?)
        .bind(article.sentiment.map(|s| s.as_str()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store article"))?;
        Ok(())
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get article"))?;
        row.as_ref().map(Self::row_to_article).transpose()
    }

    async fn get_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM articles WHERE 1 = 1");
        if let Some(category) = query.category {
            builder.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(language) = query.language {
            builder.push(" AND language = ").push_bind(language.as_str());
        }
        builder
            .push(" ORDER BY publish_date DESC LIMIT ")
            .push_bind(query.limit as i64)
            .push(" OFFSET ")
            .push_bind(query.offset as i64);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list articles"))?;
        rows.iter().map(Self::row_to_article).collect()
    }

    async fn delete_article(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete article"))?;
        Ok(())
    }

    async fn upsert_channel(&self, channel: &ChannelConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO channels
            (username, name, category, language, posts_per_scrape, description, tags,
             update_frequency, quality, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(username) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                language = excluded.language,
                posts_per_scrape = excluded.posts_per_scrape,
                description = excluded.description,
                tags = excluded.tags,
                update_frequency = excluded.update_frequency,
                quality = excluded.quality
            "#,
        )
        .bind(&channel.username)
        .bind(&channel.name)
        .bind(channel.category.as_str())
        .bind(channel.language.as_str())
        .bind(channel.posts_per_scrape as i64)
        .bind(&channel.description)
        .bind(serde_json::to_string(&channel.tags)?)
        .bind(channel.update_frequency.as_str())
        .bind(channel.quality.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store channel"))?;
        Ok(())
    }

    async fn mark_channel_scraped(&self, username: &str, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE channels SET last_scraped = ? WHERE username = ?")
            .bind(at.to_rfc3339())
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update channel"))?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("channel @{}", username)));
        }
        Ok(())
    }

    async fn list_channels(&self) -> Result<Vec<ChannelConfig>> {
        let rows = sqlx::query("SELECT * FROM channels ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list channels"))?;
        rows.iter().map(Self::row_to_channel).collect()
    }
}
