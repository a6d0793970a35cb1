//! Lazily established database pool.
//!
//! The pool is created on the first successful `ensure_connected()` and then
//! reused; a failed attempt leaves the manager unconnected so a later request
//! can try again.

use std::time::Duration;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    input_type TEXT NOT NULL,
    generated_notes TEXT NOT NULL,
    detected_language TEXT NOT NULL,
    detected_subject TEXT NOT NULL,
    original_content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

const INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes (created_at)";

#[derive(Debug)]
pub struct ConnectionManager {
    url: String,
    pool: OnceCell<SqlitePool>,
}

impl ConnectionManager {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool: OnceCell::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    /// Returns the pool, connecting (and creating the schema) on first use.
    pub async fn ensure_connected(&self) -> Result<&SqlitePool, StoreError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = connect(&self.url).await.map_err(|e| {
                    warn!(error = %e, "database connection failed");
                    StoreError::Unavailable(e.to_string())
                })?;
                info!(url = %redact(&self.url), "database connected");
                Ok::<_, StoreError>(pool)
            })
            .await
    }
}

async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    // Each connection to `:memory:` is its own database: keep exactly one alive.
    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .idle_timeout(Some(Duration::from_secs(60)))
    };

    let pool = options
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    sqlx::query(SCHEMA).execute(&pool).await?;
    sqlx::query(INDEX).execute(&pool).await?;
    Ok(pool)
}

/// Strips credentials/query from URLs before logging.
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connects_once_and_reuses_the_pool() {
        let mgr = ConnectionManager::new("sqlite::memory:");
        assert!(!mgr.is_connected());
        let a = mgr.ensure_connected().await.unwrap() as *const SqlitePool;
        let b = mgr.ensure_connected().await.unwrap() as *const SqlitePool;
        assert_eq!(a, b);
        assert!(mgr.is_connected());
    }

    #[tokio::test]
    async fn failed_connect_stays_unconnected() {
        let mgr = ConnectionManager::new("sqlite:/definitely/not/here/notes.db");
        assert!(mgr.ensure_connected().await.is_err());
        assert!(!mgr.is_connected());
    }

    #[test]
    fn redacts_query_string() {
        assert_eq!(redact("sqlite:data/notes.db?mode=rwc"), "sqlite:data/notes.db");
    }
}
