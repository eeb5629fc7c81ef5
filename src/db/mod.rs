//! Database module for SQLite persistence.
//!
//! Each document collection (courses, enrollments, discussions) is a table
//! keyed by a UUID identifier.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id BLOB PRIMARY KEY,
            doc TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // course_id holds the course's own identifier type so lookups by it match.
    // snapshot is a JSON object of the course display fields.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrollments (
            id BLOB PRIMARY KEY,
            user_email TEXT NOT NULL,
            course_id BLOB NOT NULL,
            snapshot TEXT NOT NULL DEFAULT '{}',
            enrolled_at TEXT NOT NULL,
            UNIQUE (user_email, course_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS discussions (
            id BLOB PRIMARY KEY,
            content TEXT NOT NULL,
            author TEXT NOT NULL,
            author_id TEXT NOT NULL,
            votes INTEGER NOT NULL DEFAULT 0,
            posted_at TEXT NOT NULL,
            replies TEXT NOT NULL DEFAULT '[]'
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_courses_created_at ON courses(created_at);
        CREATE INDEX IF NOT EXISTS idx_courses_user_email
            ON courses(json_extract(doc, '$.userEmail'));
        CREATE INDEX IF NOT EXISTS idx_enrollments_course_id ON enrollments(course_id);
        CREATE INDEX IF NOT EXISTS idx_discussions_posted_at ON discussions(posted_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
