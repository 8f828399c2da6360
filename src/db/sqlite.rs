//! SQLite implementation of [`DirectoryStore`] and [`AccessStore`].
//!
//! Uses [`sqlx`] with the `sqlite` feature.  Migrations are run automatically
//! on startup via [`SqliteStore::connect`].
//!
//! # Migrations path
//!
//! `sqlx::migrate!("./migrations")` resolves the path **at compile time**
//! relative to `CARGO_MANIFEST_DIR` (the crate root), so the directory is
//! embedded into the binary.  The database file location is determined at
//! runtime by the `SHAREWARD_DATABASE_URL` environment variable and is **not**
//! related to the current working directory at runtime.
//!
//! # Queries
//!
//! The `sqlx::query` (runtime-verified) form is used deliberately so that no
//! `DATABASE_URL` environment variable is needed at compile time.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::{AccessRecord, AccessStore, DirectoryRecord, DirectoryStore, SharedDirectory};

/// SQLite-backed catalog and access-state store.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g.
    /// `"sqlite://shareward.db"` or `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // An in-memory database exists per connection; the pool must be
        // pinned to a single long-lived connection so every query sees the
        // same database.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePool::connect_with(options).await?
        };
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

/// Parse an RFC 3339 timestamp column, falling back to `now` on corruption.
fn parse_ts(raw: &str, column: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, column = %column, error = %e, "failed to parse timestamp; using now");
        Utc::now()
    })
}

impl DirectoryStore for SqliteStore {
    async fn insert_directory(
        &self,
        name: &str,
        browse: &str,
    ) -> Result<DirectoryRecord, sqlx::Error> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO directory (name, browse, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(name)
        .bind(browse)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(DirectoryRecord {
            id: result.last_insert_rowid(),
            name: name.to_owned(),
            browse: browse.to_owned(),
            created_at,
        })
    }

    async fn get_directory(&self, id: i64) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        let row: Option<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, name, browse, created_at FROM directory WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, browse, created_at)| DirectoryRecord {
            id,
            name,
            browse,
            created_at: parse_ts(&created_at, "directory.created_at"),
        }))
    }

    async fn get_directory_by_browse(
        &self,
        browse: &str,
    ) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        let row: Option<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, name, browse, created_at FROM directory WHERE browse = ?1",
        )
        .bind(browse)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, browse, created_at)| DirectoryRecord {
            id,
            name,
            browse,
            created_at: parse_ts(&created_at, "directory.created_at"),
        }))
    }

    async fn list_directories(&self) -> Result<Vec<DirectoryRecord>, sqlx::Error> {
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, name, browse, created_at FROM directory ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, browse, created_at)| DirectoryRecord {
                id,
                name,
                browse,
                created_at: parse_ts(&created_at, "directory.created_at"),
            })
            .collect())
    }

    async fn delete_directory(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM directory WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// ── AccessStore ───────────────────────────────────────────────────────────────

/// Subquery selecting each directory's most recent access row.
const CURRENT_ACCESS: &str =
    "SELECT id_directory, MAX(id) AS max_id FROM directory_access GROUP BY id_directory";

impl AccessStore for SqliteStore {
    async fn current_access(&self, directory_id: i64) -> Result<Option<AccessRecord>, sqlx::Error> {
        let row: Option<(i64, i64, i64, String, String)> = sqlx::query_as(
            "SELECT id, id_directory, is_shared, share_name, updated_at \
             FROM directory_access WHERE id_directory = ?1 \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(directory_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, directory_id, is_shared, share_name, updated_at)| AccessRecord {
            id,
            directory_id,
            is_shared: is_shared != 0,
            share_name,
            updated_at: parse_ts(&updated_at, "directory_access.updated_at"),
        }))
    }

    async fn set_access(
        &self,
        directory_id: i64,
        is_shared: bool,
        share_name: &str,
        at: DateTime<Utc>,
    ) -> Result<AccessRecord, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO directory_access (id_directory, is_shared, share_name, updated_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(directory_id)
        .bind(is_shared as i64)
        .bind(share_name)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(AccessRecord {
            id: result.last_insert_rowid(),
            directory_id,
            is_shared,
            share_name: share_name.to_owned(),
            updated_at: at,
        })
    }

    async fn find_by_share_name(
        &self,
        share_name: &str,
    ) -> Result<Option<AccessRecord>, sqlx::Error> {
        // Only a directory's *current* record counts; a stale historical row
        // with the same name must not resolve to that directory.
        let sql = format!(
            "SELECT a.id, a.id_directory, a.is_shared, a.share_name, a.updated_at \
             FROM directory_access a \
             JOIN ({CURRENT_ACCESS}) cur ON a.id = cur.max_id \
             WHERE a.share_name = ?1 \
             ORDER BY a.id DESC LIMIT 1"
        );
        let row: Option<(i64, i64, i64, String, String)> = sqlx::query_as(&sql)
            .bind(share_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, directory_id, is_shared, share_name, updated_at)| AccessRecord {
            id,
            directory_id,
            is_shared: is_shared != 0,
            share_name,
            updated_at: parse_ts(&updated_at, "directory_access.updated_at"),
        }))
    }

    async fn list_shared(&self) -> Result<Vec<SharedDirectory>, sqlx::Error> {
        let sql = format!(
            "SELECT d.id, d.name, d.browse, a.share_name, a.updated_at \
             FROM directory_access a \
             JOIN ({CURRENT_ACCESS}) cur ON a.id = cur.max_id \
             JOIN directory d ON d.id = a.id_directory \
             WHERE a.is_shared = 1 \
             ORDER BY d.id"
        );
        let rows: Vec<(i64, String, String, String, String)> =
            sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(directory_id, name, browse, share_name, updated_at)| SharedDirectory {
                directory_id,
                name,
                browse,
                share_name,
                updated_at: parse_ts(&updated_at, "directory_access.updated_at"),
            })
            .collect())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
