use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// The task service's own sqlite store. A distinct persistence domain from the
/// main app's database; nothing spans the two.
pub struct TaskDb {
    pub pool: SqlitePool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    task TEXT,
    date DATE NOT NULL,
    priority BOOLEAN NOT NULL DEFAULT FALSE,
    completed BOOLEAN NOT NULL DEFAULT FALSE,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    username TEXT
)
"#;

impl TaskDb {
    pub async fn connect(database_url: &str) -> Result<Self> {
        log::info!("Connecting to task database...");

        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid task database URL")?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to the task database")?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to create tasks table")?;

        log::info!("Task database ready");
        Ok(TaskDb { pool })
    }

    /// Fresh in-memory store, schema applied. A single connection keeps the
    /// in-memory database alive for the pool's lifetime.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory task database")?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to create tasks table")?;

        Ok(TaskDb { pool })
    }
}
