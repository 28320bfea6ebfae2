//! SQLite pool setup and schema migrations.

use anyhow::{Context, Result};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::{path::Path, sync::Arc};

/// Migrations embedded at build time, applied in order.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_init.sql",
    include_str!("../migrations/0001_init.sql"),
)];

/// Open the pool, creating the database file and its parent directory when missing.
pub async fn connect(database_url: &str) -> Result<Arc<SqlitePool>> {
    if !is_memory_url(database_url) {
        prepare_db_file(database_url)?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .with_context(|| format!("connecting to {}", database_url))?;

    Ok(Arc::new(pool))
}

/// Run every embedded migration. Statements are idempotent.
pub async fn run_migrations(db: &SqlitePool) -> Result<()> {
    for (name, sql) in MIGRATIONS {
        let statements = split_statements(sql);

        tracing::info!("Running {} statements from {}...", statements.len(), name);

        for stmt in statements {
            tracing::debug!("Executing migration SQL: {}", stmt);
            sqlx::query(&stmt)
                .execute(db)
                .await
                .with_context(|| format!("applying migration {}", name))?;
        }
    }

    Ok(())
}

/// Drop `--` comment lines, then split on `;`.
fn split_statements(sql: &str) -> Vec<String> {
    sql.lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn prepare_db_file(database_url: &str) -> Result<()> {
    // Extract the local file path SQLx will use
    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    let db_path_obj = Path::new(db_path);
    if let Some(parent) = db_path_obj.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {:?}", parent))?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // SQLx refuses to open a missing file without `mode=rwc`.
    if let Err(e) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(db_path)
    {
        tracing::warn!("Failed to create database file {}: {}", db_path, e);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Single-connection in-memory pool; every connection would otherwise get its own database.
    pub(crate) async fn memory_pool() -> Arc<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        Arc::new(pool)
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'drs_objects'",
        )
        .fetch_all(&*pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["drs_objects".to_string()]);
    }

    #[test]
    fn semicolons_in_comments_do_not_split_statements() {
        let statements = split_statements(
            "-- first; second\nCREATE TABLE a (x INTEGER);\n\n-- trailing;\nCREATE INDEX i ON a (x);\n",
        );
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (x INTEGER)", "CREATE INDEX i ON a (x)"]
        );
    }

    #[tokio::test]
    async fn embedded_migration_applies_to_fresh_pool() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();

        let indexes: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'drs_objects'",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert!(indexes.contains(&"idx_drs_objects_drs_id".to_string()));
    }

    #[tokio::test]
    async fn connect_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("drs.db");
        let url = format!("sqlite://{}", path.display());

        let pool = connect(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        assert!(path.exists());
    }
}
