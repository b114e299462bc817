use anyhow::{Context, Result};
use sqlx::{PgPool, Row};

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        log::info!("Connecting to database...");

        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to the database")?;

        log::info!("Database connection established");

        Ok(Database { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let row = sqlx::query("SELECT 1 as health_check")
            .fetch_one(&self.pool)
            .await
            .context("Failed to execute health check query")?;

        let result: i32 = row.get("health_check");

        if result == 1 {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Database health check failed"))
        }
    }

    pub async fn check_tables(&self) -> Result<()> {
        log::info!("Checking database tables...");

        let tables = sqlx::query(
            r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name IN ('users', 'groups', 'group_members', 'group_tasks', 'user_files')
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to check database tables")?;

        let expected_tables = vec!["group_members", "group_tasks", "groups", "user_files", "users"];
        let found_tables: Vec<String> = tables
            .iter()
            .map(|row| row.get::<String, _>("table_name"))
            .collect();

        log::info!("Found tables: {:?}", found_tables);

        if found_tables.len() == expected_tables.len() {
            log::info!("All required tables exist");
        } else {
            log::warn!("Some tables may be missing. Expected: {:?}", expected_tables);
            log::warn!("   Run the schema.sql script against your database if tables are missing");
        }

        Ok(())
    }

    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let stats = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) as user_count,
                (SELECT COUNT(*) FROM groups) as group_count,
                (SELECT COUNT(*) FROM group_tasks) as group_task_count,
                (SELECT COUNT(*) FROM user_files) as file_count
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to get database statistics")?;

        Ok(DatabaseStats {
            users: stats.get::<i64, _>("user_count"),
            groups: stats.get::<i64, _>("group_count"),
            group_tasks: stats.get::<i64, _>("group_task_count"),
            files: stats.get::<i64, _>("file_count"),
        })
    }
}

#[derive(Debug)]
pub struct DatabaseStats {
    pub users: i64,
    pub groups: i64,
    pub group_tasks: i64,
    pub files: i64,
}

impl DatabaseStats {
    pub fn log_stats(&self) {
        log::info!("Database statistics:");
        log::info!("   Users: {}", self.users);
        log::info!("   Groups: {}", self.groups);
        log::info!("   Group tasks: {}", self.group_tasks);
        log::info!("   Files: {}", self.files);
    }
}
