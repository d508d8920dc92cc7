// SQLite pool for the interaction history
//
// Several `flowsense` invocations can hit the same history file at once (a
// shell hook recording while `predict` runs), so file databases use WAL and
// wait on a locked database instead of failing.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 5;

// How long a writer waits for another process to release the lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Database {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl Database {
    /// Open (or create) the history database at `db_path`
    ///
    /// ```no_run
    /// use flowsense_lib::db::Database;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::new("/tmp/flowsense/history.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            db_path,
        };
        db.initialize_schema().await?;

        tracing::debug!(path = %db.db_path.display(), "opened history database");
        Ok(db)
    }

    /// Private in-memory database
    ///
    /// Every in-memory connection is its own database, so the pool is
    /// pinned to a single connection.
    pub async fn in_memory() -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:")?.disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            db_path: PathBuf::from(":memory:"),
        };
        db.initialize_schema().await?;

        Ok(db)
    }

    async fn initialize_schema(&self) -> Result<()> {
        let schema = include_str!("../../database/schema.sql");

        // sqlx runs one statement per query
        for statement in schema.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed).execute(self.pool.as_ref()).await?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Row counts for the status screen
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let (total_interactions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM interactions")
            .fetch_one(self.pool.as_ref())
            .await?;

        let (total_feedback, accepted_feedback): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(accepted), 0) FROM prediction_feedback",
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(DatabaseStats {
            total_interactions,
            total_feedback,
            accepted_feedback,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    pub total_interactions: i64,
    pub total_feedback: i64,
    pub accepted_feedback: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{PredictionFeedback, UserInteraction};
    use crate::intelligence::InteractionContext;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_database_stats() {
        let db = Database::in_memory().await.unwrap();
        let stats = db.stats().await.unwrap();

        assert_eq!(
            stats,
            DatabaseStats {
                total_interactions: 0,
                total_feedback: 0,
                accepted_feedback: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_file_database_uses_wal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("history.db");

        let db = Database::new(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), path.as_path());

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        db.close().await;
    }

    #[tokio::test]
    async fn test_two_handles_share_one_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.db");

        let recorder = Database::new(&path).await.unwrap();
        let reader = Database::new(&path).await.unwrap();

        recorder
            .insert_interaction(&UserInteraction::workflow_run(
                "standup",
                InteractionContext::at_hour(9),
            ))
            .await
            .unwrap();
        reader
            .insert_feedback(&PredictionFeedback::new("standup", true))
            .await
            .unwrap();

        let stats = reader.stats().await.unwrap();
        assert_eq!(stats.total_interactions, 1);
        assert_eq!(stats.accepted_feedback, 1);

        recorder.close().await;
        reader.close().await;
    }
}
