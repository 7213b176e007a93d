use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::Result;

#[derive(Clone)]
pub struct SubscriberDb {
    pool: SqlitePool,
}

impl SubscriberDb {
    /// Open (creating if missing) the database and apply the schema.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true);

        // Each in-memory connection is its own database, so keep exactly one alive.
        let pool = if Self::is_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let db = Self { pool };
        db.init_schema().await?;

        tracing::info!("Subscriber database ready ({})", database_url);
        Ok(db)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        let schema = include_str!("../../../schema.sql");

        // sqlx runs one statement per query
        for statement in schema.split(';') {
            let stmt = strip_comments(statement);
            if !stmt.is_empty() {
                sqlx::query(&stmt).execute(&self.pool).await?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn is_memory(database_url: &str) -> bool {
        database_url.contains(":memory:") || database_url.contains("mode=memory")
    }
}

fn strip_comments(statement: &str) -> String {
    statement
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_db_creation() {
        let db = SubscriberDb::new("sqlite::memory:").await.unwrap();
        assert!(db.pool().acquire().await.is_ok());

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'subscribers'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_schema_is_reapplied_safely() {
        let db = SubscriberDb::new("sqlite::memory:").await.unwrap();
        assert!(db.init_schema().await.is_ok());
    }

    #[test]
    fn test_strip_comments() {
        let stmt = strip_comments("-- header\n\nCREATE TABLE t (x INTEGER)\n");
        assert_eq!(stmt, "CREATE TABLE t (x INTEGER)");
        assert!(strip_comments("  -- only a comment\n").is_empty());
    }
}
