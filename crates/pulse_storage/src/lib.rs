use std::sync::Arc;

use pulse_core::{ArticleStorage, Error, Result};
use tracing::info;

pub mod backends;

pub use backends::*;

/// Backend names accepted by [`create_storage`].
pub const STORAGE_KINDS: &[&str] = &["memory", "sqlite"];

/// Builds the backend named by `kind`. `url` is only read by persistent backends.
pub async fn create_storage(kind: &str, url: Option<&str>) -> Result<Arc<dyn ArticleStorage>> {
    match kind.trim().to_lowercase().as_str() {
        "memory" => {
            info!("💾 Using in-memory storage");
            Ok(Arc::new(MemoryStorage::new()))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let url = url.unwrap_or(sqlite::DEFAULT_PATH);
            info!("💾 Using SQLite storage at {}", url);
            Ok(Arc::new(SQLiteStorage::connect(url).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => {
            let _ = url;
            Err(Error::Config(
                "SQLite support is not compiled in; rebuild with the `sqlite` feature".to_string(),
            ))
        }
        other => Err(Error::Config(format!(
            "Unknown storage backend: {} (expected one of: {})",
            other,
            STORAGE_KINDS.join(", ")
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_storage() {
        assert!(create_storage("memory", None).await.is_ok());
        assert!(create_storage(" Memory ", Some("ignored")).await.is_ok());
        assert!(matches!(create_storage("qdrant", None).await, Err(Error::Config(_))));
    }
}
