//! Database abstraction layer.
//!
//! [`DirectoryStore`] is the directory catalog; [`AccessStore`] is the
//! per-directory share-state record. The default implementation of both is
//! [`sqlite::SqliteStore`]. To swap to another database, implement the two
//! traits for your new type and change the concrete type in
//! [`crate::state::AppState`].
//!
//! All trait methods use `impl Future` in their signatures (stable since Rust
//! 1.75) so no extra `async-trait` crate is required.

pub mod sqlite;

use chrono::{DateTime, Utc};

/// A row in the `directory` table: a cataloged filesystem directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryRecord {
    /// Catalog identity, assigned by the database on insert.
    pub id: i64,
    /// Display name, also the seed for derived share names.
    pub name: String,
    /// Filesystem path ("browse path"); unique within the catalog.
    pub browse: String,
    pub created_at: DateTime<Utc>,
}

/// A row in the `directory_access` table: one share-state transition.
///
/// Rows are append-only; the current state of a directory is its row with
/// the greatest `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessRecord {
    pub id: i64,
    pub directory_id: i64,
    pub is_shared: bool,
    /// OS share name used for this transition; persisted so a later close
    /// can resolve the directory from the name alone.
    pub share_name: String,
    pub updated_at: DateTime<Utc>,
}

/// A currently-shared directory: the catalog row joined with its current
/// access record.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedDirectory {
    pub directory_id: i64,
    pub name: String,
    pub browse: String,
    pub share_name: String,
    pub updated_at: DateTime<Utc>,
}

/// Trait for the directory catalog.
pub trait DirectoryStore: Send + Sync + 'static {
    /// Insert a new directory and return it with its assigned id.
    fn insert_directory(
        &self,
        name: &str,
        browse: &str,
    ) -> impl std::future::Future<Output = Result<DirectoryRecord, sqlx::Error>> + Send;

    fn get_directory(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<DirectoryRecord>, sqlx::Error>> + Send;

    /// Look up a directory by its browse path (unique).
    fn get_directory_by_browse(
        &self,
        browse: &str,
    ) -> impl std::future::Future<Output = Result<Option<DirectoryRecord>, sqlx::Error>> + Send;

    /// All directories, ordered by ascending id for reproducible iteration.
    fn list_directories(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<DirectoryRecord>, sqlx::Error>> + Send;

    /// Delete a directory; returns rows affected (0 for an unknown id).
    fn delete_directory(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<u64, sqlx::Error>> + Send;
}

/// Trait for the per-directory share-state record.
///
/// Does not itself talk to the OS; only the engine writes here, and only
/// after the share tool reported success.
pub trait AccessStore: Send + Sync + 'static {
    /// The most recent access record for a directory, if any.
    fn current_access(
        &self,
        directory_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<AccessRecord>, sqlx::Error>> + Send;

    /// Append a new state transition. A single INSERT, all-or-nothing.
    fn set_access(
        &self,
        directory_id: i64,
        is_shared: bool,
        share_name: &str,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<AccessRecord, sqlx::Error>> + Send;

    /// The directory whose *current* access record carries `share_name`.
    fn find_by_share_name(
        &self,
        share_name: &str,
    ) -> impl std::future::Future<Output = Result<Option<AccessRecord>, sqlx::Error>> + Send;

    /// Directories whose current access record has `is_shared = true`,
    /// joined with name/browse from the catalog.
    fn list_shared(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<SharedDirectory>, sqlx::Error>> + Send;
}
