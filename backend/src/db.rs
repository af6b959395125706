//! Relational store shared by the identity, profile, and event layers.
//!
//! The pool is a sqlx `AnyPool`, so the same queries run against SQLite
//! (local use and tests) and PostgreSQL. Queries stick to portable SQL with
//! `$N` placeholders; ids and timestamps are stored as `TEXT`.

use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::error::{AppError, Result};

const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        email TEXT NOT NULL UNIQUE,
        name TEXT,
        default_profile_id TEXT
    )",
    "CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL REFERENCES users(id),
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY NOT NULL,
        profile_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        notes TEXT NOT NULL DEFAULT ''
    )",
];

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_profiles_user ON profiles(user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_events_profile_start ON events(profile_id, start_time)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Sqlite,
    Postgres,
}

impl DbKind {
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("sqlite:") {
            Some(DbKind::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(DbKind::Postgres)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct Db {
    pool: AnyPool,
    kind: DbKind,
}

impl Db {
    /// Connects to `url` and creates the schema if it is missing.
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let kind = DbKind::from_url(url)
            .ok_or_else(|| AppError::Internal(format!("unsupported database url scheme: {}", redact_url(url))))?;

        // SQLite connections already get a 5 s busy timeout from the driver.
        let pool = AnyPoolOptions::new().max_connections(5).connect(url).await?;

        let db = Self { pool, kind };
        db.initialize().await?;
        Ok(db)
    }

    /// Private in-memory SQLite database, gone when the `Db` is dropped.
    ///
    /// A single connection is kept open for the pool's lifetime, since each
    /// SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self {
            pool,
            kind: DbKind::Sqlite,
        };
        db.initialize().await?;
        Ok(db)
    }

    async fn initialize(&self) -> Result<()> {
        for stmt in CREATE_TABLES.iter().chain(CREATE_INDEXES) {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        log::debug!("schema ready ({:?})", self.kind);
        Ok(())
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Reads a UUID stored as text. A malformed value means the table was
/// written by something other than this service.
pub(crate) fn uuid_column(row: &AnyRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw)
        .map_err(|e| AppError::Internal(format!("corrupt id in column {column}: {e}")))
}

pub(crate) fn optional_uuid_column(row: &AnyRow, column: &str) -> Result<Option<Uuid>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| {
        Uuid::parse_str(&value)
            .map_err(|e| AppError::Internal(format!("corrupt id in column {column}: {e}")))
    })
    .transpose()
}

/// Strips credentials from a connection URL before it is logged.
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
