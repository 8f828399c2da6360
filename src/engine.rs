//! Access synchronization engine.
//!
//! The one place where two independently-failing systems meet: the durable
//! access record (SQLite) and the privileged OS share operation. The rule is
//! strict ordering – invoke the executor first, write the store only after
//! the executor reported success. A store failure *after* a successful OS
//! operation is the single ambiguous case and is surfaced as
//! [`EngineError::PartialSuccess`] so callers can reconcile manually.
//!
//! Operations on the same directory are serialized through a per-directory
//! async lock; distinct directories reconcile independently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{AccessRecord, AccessStore, DirectoryStore, SharedDirectory};
use crate::share::{ShareExecutor, ShareOutcome};

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Blank or missing input, detected before any OS invocation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Directory identity unknown to the catalog.
    #[error("not found: {0}")]
    NotFound(String),

    /// The OS share command did not succeed; no state was mutated.
    #[error("share operation failed: {output}")]
    ShareFailed {
        output: String,
        exit_code: Option<i32>,
    },

    /// Store read/write failure with no OS side effect.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// The OS operation succeeded but the state write failed afterwards.
    /// Persisted state and real share state now disagree.
    #[error("share operation succeeded but state write failed: {source}")]
    PartialSuccess {
        output: String,
        source: sqlx::Error,
    },
}

/// A completed open/close: the freshly written access record plus the
/// captured tool output.
#[derive(Debug, Clone)]
pub struct Transition {
    pub record: AccessRecord,
    pub output: String,
}

/// One directory's failure inside a bulk operation.
#[derive(Debug, Clone)]
pub struct BulkFailure {
    pub directory_id: i64,
    pub name: String,
    pub error: String,
}

/// Aggregate result of `open_all` / `close_all`.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<BulkFailure>,
}

impl BulkReport {
    fn record_ok(&mut self) {
        self.succeeded += 1;
    }

    fn record_failure(&mut self, directory_id: i64, name: &str, error: &EngineError) {
        warn!(directory_id, name = %name, error = %error, "bulk share operation failed for directory");
        self.failed += 1;
        self.failures.push(BulkFailure {
            directory_id,
            name: name.to_owned(),
            error: error.to_string(),
        });
    }
}

/// Derive a deterministic share name from a directory's display name:
/// trimmed, internal whitespace runs collapsed to `_`.
///
/// Collisions between two directories are possible and intentional – the
/// second create is expected to fail at the OS layer and is reported as that
/// directory's failure.
pub fn derive_share_name(display_name: &str) -> String {
    display_name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Tracks per-directory locks, keyed by directory id.
struct DirLocks {
    locks: std::sync::Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl DirLocks {
    fn new() -> Self {
        Self { locks: std::sync::Mutex::new(HashMap::new()) }
    }

    /// The lock for a directory, created on first use and kept for the
    /// process lifetime (the catalog is small).
    fn for_directory(&self, id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(map.entry(id).or_default())
    }
}

/// The reconciliation core: catalog reads, executor invocations, and access
/// writes, in that order, failure-tolerant in bulk.
pub struct AccessSyncEngine<S, X> {
    store: S,
    executor: X,
    locks: DirLocks,
}

impl<S, X> AccessSyncEngine<S, X>
where
    S: DirectoryStore + AccessStore,
    X: ShareExecutor,
{
    pub fn new(store: S, executor: X) -> Self {
        Self { store, executor, locks: DirLocks::new() }
    }

    /// Create the OS share for a directory and, on success, record it as
    /// shared. Re-invoking on an already-open directory simply rewrites the
    /// state with a fresh timestamp.
    pub async fn open(&self, directory_id: i64, share_name: &str) -> Result<Transition, EngineError> {
        let share_name = validated_share_name(share_name)?;
        let lock = self.locks.for_directory(directory_id);
        let _guard = lock.lock().await;

        let dir = self
            .store
            .get_directory(directory_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("directory {directory_id} not found")))?;

        let outcome = self.executor.create_share(&dir.browse, share_name).await;
        let transition = self.commit(directory_id, true, outcome).await?;
        info!(directory_id, share_name = %transition.record.share_name, "directory opened");
        Ok(transition)
    }

    /// Remove the OS share and, on success, record the directory as closed.
    /// On failure the directory stays marked as shared.
    pub async fn close(&self, directory_id: i64, share_name: &str) -> Result<Transition, EngineError> {
        let share_name = validated_share_name(share_name)?;
        let lock = self.locks.for_directory(directory_id);
        let _guard = lock.lock().await;

        if self.store.get_directory(directory_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("directory {directory_id} not found")));
        }

        let outcome = self.executor.remove_share(share_name).await;
        let transition = self.commit(directory_id, false, outcome).await?;
        info!(directory_id, share_name = %transition.record.share_name, "directory closed");
        Ok(transition)
    }

    /// Attempt to open every cataloged directory under a share name derived
    /// from its display name. Individual failures are collected, never fatal.
    pub async fn open_all(&self) -> Result<BulkReport, EngineError> {
        let mut report = BulkReport::default();
        for dir in self.store.list_directories().await? {
            let share_name = derive_share_name(&dir.name);
            match self.open(dir.id, &share_name).await {
                Ok(_) => report.record_ok(),
                Err(e) => report.record_failure(dir.id, &dir.name, &e),
            }
        }
        info!(succeeded = report.succeeded, failed = report.failed, "open-all finished");
        Ok(report)
    }

    /// Attempt to close every cataloged directory, preferring the share name
    /// persisted on its current access record over re-derivation.
    pub async fn close_all(&self) -> Result<BulkReport, EngineError> {
        let mut report = BulkReport::default();
        for dir in self.store.list_directories().await? {
            let share_name = match self.store.current_access(dir.id).await {
                Ok(Some(access)) => access.share_name,
                Ok(None) => derive_share_name(&dir.name),
                Err(e) => {
                    report.record_failure(dir.id, &dir.name, &EngineError::Storage(e));
                    continue;
                }
            };
            match self.close(dir.id, &share_name).await {
                Ok(_) => report.record_ok(),
                Err(e) => report.record_failure(dir.id, &dir.name, &e),
            }
        }
        info!(succeeded = report.succeeded, failed = report.failed, "close-all finished");
        Ok(report)
    }

    /// Directories whose current access record is shared. Pure store query;
    /// never touches the executor.
    pub async fn shared_directories(&self) -> Result<Vec<SharedDirectory>, EngineError> {
        Ok(self.store.list_shared().await?)
    }

    /// Branch on the executor outcome: failure propagates untouched state,
    /// success is persisted, and a persist failure after success is the
    /// distinct partial case.
    async fn commit(
        &self,
        directory_id: i64,
        is_shared: bool,
        outcome: ShareOutcome,
    ) -> Result<Transition, EngineError> {
        if !outcome.success {
            return Err(EngineError::ShareFailed {
                output: outcome.output,
                exit_code: outcome.exit_code,
            });
        }
        match self
            .store
            .set_access(directory_id, is_shared, &outcome.share_name, Utc::now())
            .await
        {
            Ok(record) => Ok(Transition { record, output: outcome.output }),
            Err(e) => {
                warn!(directory_id, error = %e, "state write failed after successful share operation");
                Err(EngineError::PartialSuccess { output: outcome.output, source: e })
            }
        }
    }
}

fn validated_share_name(share_name: &str) -> Result<&str, EngineError> {
    let trimmed = share_name.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation("share name must not be blank".into()));
    }
    Ok(trimmed)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;
    use crate::db::DirectoryRecord;
    use crate::db::sqlite::SqliteStore;

    /// Canned-outcome executor recording every invocation.
    #[derive(Clone, Default)]
    struct FakeExecutor {
        /// Share names whose operations are simulated to fail.
        fail_names: Arc<Mutex<HashSet<String>>>,
        /// `(op, detail)` pairs: `("create", "NAME=PATH")` / `("remove", "NAME")`.
        calls: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakeExecutor {
        fn fail_for(&self, share_name: &str) {
            self.fail_names.lock().unwrap().insert(share_name.to_owned());
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }

        fn outcome(&self, share_name: &str) -> ShareOutcome {
            if self.fail_names.lock().unwrap().contains(share_name) {
                ShareOutcome::failed(share_name, "simulated share failure".to_owned(), Some(2))
            } else {
                ShareOutcome::succeeded(share_name, "command completed".to_owned(), Some(0))
            }
        }
    }

    impl ShareExecutor for FakeExecutor {
        async fn create_share(&self, path: &str, share_name: &str) -> ShareOutcome {
            self.calls
                .lock()
                .unwrap()
                .push(("create".to_owned(), format!("{share_name}={path}")));
            self.outcome(share_name)
        }

        async fn remove_share(&self, share_name: &str) -> ShareOutcome {
            self.calls
                .lock()
                .unwrap()
                .push(("remove".to_owned(), share_name.to_owned()));
            self.outcome(share_name)
        }
    }

    /// Store whose writes always fail, for exercising the ambiguous
    /// state-write-after-successful-OS-operation path.
    struct WriteFailingStore;

    impl DirectoryStore for WriteFailingStore {
        async fn insert_directory(&self, _: &str, _: &str) -> Result<DirectoryRecord, sqlx::Error> {
            Err(sqlx::Error::PoolClosed)
        }

        async fn get_directory(&self, id: i64) -> Result<Option<DirectoryRecord>, sqlx::Error> {
            Ok(Some(DirectoryRecord {
                id,
                name: "Music".to_owned(),
                browse: "/srv/music".to_owned(),
                created_at: Utc::now(),
            }))
        }

        async fn get_directory_by_browse(&self, _: &str) -> Result<Option<DirectoryRecord>, sqlx::Error> {
            Ok(None)
        }

        async fn list_directories(&self) -> Result<Vec<DirectoryRecord>, sqlx::Error> {
            Ok(Vec::new())
        }

        async fn delete_directory(&self, _: i64) -> Result<u64, sqlx::Error> {
            Ok(0)
        }
    }

    impl AccessStore for WriteFailingStore {
        async fn current_access(&self, _: i64) -> Result<Option<AccessRecord>, sqlx::Error> {
            Ok(None)
        }

        async fn set_access(
            &self,
            _: i64,
            _: bool,
            _: &str,
            _: chrono::DateTime<Utc>,
        ) -> Result<AccessRecord, sqlx::Error> {
            Err(sqlx::Error::PoolClosed)
        }

        async fn find_by_share_name(&self, _: &str) -> Result<Option<AccessRecord>, sqlx::Error> {
            Ok(None)
        }

        async fn list_shared(&self) -> Result<Vec<SharedDirectory>, sqlx::Error> {
            Ok(Vec::new())
        }
    }

    async fn engine() -> (AccessSyncEngine<SqliteStore, FakeExecutor>, SqliteStore, FakeExecutor) {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let executor = FakeExecutor::default();
        (
            AccessSyncEngine::new(store.clone(), executor.clone()),
            store,
            executor,
        )
    }

    #[tokio::test]
    async fn open_marks_shared_and_invokes_create_once() {
        let (engine, store, exec) = engine().await;
        let dir = store.insert_directory("Music", "/srv/music").await.unwrap();

        engine.open(dir.id, "Music").await.unwrap();

        let shared = engine.shared_directories().await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].directory_id, dir.id);

        let creates: Vec<_> = exec.calls().into_iter().filter(|(op, _)| op == "create").collect();
        assert_eq!(creates, vec![("create".to_owned(), "Music=/srv/music".to_owned())]);
    }

    #[tokio::test]
    async fn failed_create_leaves_state_untouched() {
        let (engine, store, exec) = engine().await;
        let dir = store.insert_directory("Music", "/srv/music").await.unwrap();
        exec.fail_for("Music");

        let err = engine.open(dir.id, "Music").await.unwrap_err();
        match err {
            EngineError::ShareFailed { output, exit_code } => {
                assert_eq!(output, "simulated share failure");
                assert_eq!(exit_code, Some(2));
            }
            other => panic!("expected ShareFailed, got {other:?}"),
        }

        assert!(engine.shared_directories().await.unwrap().is_empty());
        assert!(store.current_access(dir.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn close_open_close_ends_unshared_with_increasing_timestamps() {
        let (engine, store, _exec) = engine().await;
        let dir = store.insert_directory("Music", "/srv/music").await.unwrap();

        let t1 = engine.close(dir.id, "Music").await.unwrap();
        let t2 = engine.open(dir.id, "Music").await.unwrap();
        let t3 = engine.close(dir.id, "Music").await.unwrap();

        assert!(t1.record.updated_at < t2.record.updated_at);
        assert!(t2.record.updated_at < t3.record.updated_at);
        assert!(engine.shared_directories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_all_tolerates_individual_failures() {
        let (engine, store, exec) = engine().await;
        let _a = store.insert_directory("Music", "/srv/music").await.unwrap();
        let b = store.insert_directory("Video", "/srv/video").await.unwrap();
        let _c = store.insert_directory("Books", "/srv/books").await.unwrap();
        exec.fail_for("Video");

        let report = engine.open_all().await.unwrap();
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].directory_id, b.id);
        assert!(report.failures[0].error.contains("simulated share failure"));

        let shared = engine.shared_directories().await.unwrap();
        let names: Vec<_> = shared.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Music", "Books"]);
    }

    #[tokio::test]
    async fn open_twice_keeps_one_current_record_with_later_timestamp() {
        let (engine, store, _exec) = engine().await;
        let dir = store.insert_directory("Music", "/srv/music").await.unwrap();

        let first = engine.open(dir.id, "Music").await.unwrap();
        let second = engine.open(dir.id, "Music").await.unwrap();

        let current = store.current_access(dir.id).await.unwrap().unwrap();
        assert!(current.is_shared);
        assert_eq!(current.id, second.record.id);
        assert!(current.updated_at > first.record.updated_at);
        assert_eq!(engine.shared_directories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_share_name_is_rejected_before_any_invocation() {
        let (engine, store, exec) = engine().await;
        let dir = store.insert_directory("Music", "/srv/music").await.unwrap();

        let err = engine.open(dir.id, "   ").await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(exec.calls().is_empty());
        assert!(store.current_access(dir.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_directory_is_rejected_before_any_invocation() {
        let (engine, _store, exec) = engine().await;
        let err = engine.open(42, "Music").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn close_all_prefers_persisted_share_name() {
        let (engine, store, exec) = engine().await;
        let dir = store.insert_directory("My Music", "/srv/music").await.unwrap();
        engine.open(dir.id, "Custom_Name").await.unwrap();

        let report = engine.close_all().await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);

        let removes: Vec<_> = exec.calls().into_iter().filter(|(op, _)| op == "remove").collect();
        assert_eq!(removes, vec![("remove".to_owned(), "Custom_Name".to_owned())]);
    }

    #[tokio::test]
    async fn close_all_falls_back_to_derived_name() {
        let (engine, store, exec) = engine().await;
        store.insert_directory("My  Shared Music", "/srv/music").await.unwrap();

        engine.close_all().await.unwrap();
        let removes: Vec<_> = exec.calls().into_iter().filter(|(op, _)| op == "remove").collect();
        assert_eq!(removes, vec![("remove".to_owned(), "My_Shared_Music".to_owned())]);
    }

    #[tokio::test]
    async fn state_write_failure_after_successful_open_is_partial() {
        let exec = FakeExecutor::default();
        let engine = AccessSyncEngine::new(WriteFailingStore, exec.clone());

        let err = engine.open(1, "Music").await.unwrap_err();
        match err {
            EngineError::PartialSuccess { output, .. } => {
                assert_eq!(output, "command completed");
            }
            other => panic!("expected PartialSuccess, got {other:?}"),
        }
        // The OS operation did run; only the record write failed.
        assert_eq!(
            exec.calls(),
            vec![("create".to_owned(), "Music=/srv/music".to_owned())]
        );
    }

    #[tokio::test]
    async fn state_write_failure_after_successful_close_is_partial() {
        let exec = FakeExecutor::default();
        let engine = AccessSyncEngine::new(WriteFailingStore, exec.clone());

        let err = engine.close(1, "Music").await.unwrap_err();
        assert!(matches!(err, EngineError::PartialSuccess { .. }));
    }

    #[tokio::test]
    async fn shared_directories_never_invokes_executor() {
        let (engine, store, exec) = engine().await;
        let dir = store.insert_directory("Music", "/srv/music").await.unwrap();
        store.set_access(dir.id, true, "Music", Utc::now()).await.unwrap();

        let shared = engine.shared_directories().await.unwrap();
        assert_eq!(shared.len(), 1);
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn share_name_derivation_is_deterministic() {
        assert_eq!(derive_share_name("Music"), "Music");
        assert_eq!(derive_share_name("  My  Shared Music  "), "My_Shared_Music");
        assert_eq!(derive_share_name(derive_share_name("A B").as_str()), "A_B");
    }
}
