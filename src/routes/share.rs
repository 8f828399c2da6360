//! Network-share endpoints over the access synchronization engine.
//!
//! Single open/close resolve their target directory here (by browse path for
//! open, by persisted share name for close) and delegate to the engine; the
//! bulk endpoints return the engine's aggregate report with HTTP 200 even
//! when some directories failed.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::db::{AccessStore, DirectoryStore};
use crate::error::ServerError;
use crate::schemas::share::{
    BulkReportResponse, CloseShareRequest, OpenShareRequest, ShareActionResponse,
    SharedDirectoryResponse,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(open_share, close_share, open_all, close_all, list_shared),
    components(schemas(
        OpenShareRequest,
        CloseShareRequest,
        ShareActionResponse,
        BulkReportResponse,
        SharedDirectoryResponse
    ))
)]
pub struct ShareApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/share", get(list_shared))
        .route("/share/open", post(open_share))
        .route("/share/close", post(close_share))
        .route("/share/open-all", post(open_all))
        .route("/share/close-all", post(close_all))
}

#[utoipa::path(
    post,
    path = "/api/share/open",
    tag = "share",
    request_body = OpenShareRequest,
    responses(
        (status = 200, description = "Share created and recorded", body = ShareActionResponse),
        (status = 400, description = "Blank path or share name"),
        (status = 404, description = "Path not in the catalog"),
        (status = 500, description = "Share operation failed; body carries tool output"),
    )
)]
pub async fn open_share(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OpenShareRequest>,
) -> Result<Json<ShareActionResponse>, ServerError> {
    let path = req.path.trim();
    if path.is_empty() {
        return Err(ServerError::BadRequest("path must not be empty".into()));
    }
    if req.share_name.trim().is_empty() {
        return Err(ServerError::BadRequest("shareName must not be empty".into()));
    }

    let dir = state
        .store
        .get_directory_by_browse(path)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("path '{path}' is not cataloged")))?;

    let transition = state.engine.open(dir.id, &req.share_name).await?;
    Ok(Json(ShareActionResponse::from_transition(
        format!("share '{}' created for '{}'", transition.record.share_name, dir.browse),
        transition,
    )))
}

#[utoipa::path(
    post,
    path = "/api/share/close",
    tag = "share",
    request_body = CloseShareRequest,
    responses(
        (status = 200, description = "Share removed and recorded", body = ShareActionResponse),
        (status = 400, description = "Blank share name"),
        (status = 404, description = "No directory currently carries this share name"),
        (status = 500, description = "Share operation failed; body carries tool output"),
    )
)]
pub async fn close_share(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CloseShareRequest>,
) -> Result<Json<ShareActionResponse>, ServerError> {
    let share_name = req.share_name.trim();
    if share_name.is_empty() {
        return Err(ServerError::BadRequest("shareName must not be empty".into()));
    }

    // The share name is persisted on each access record precisely so this
    // endpoint can resolve the directory without the caller tracking the
    // mapping out-of-band.
    let access = state
        .store
        .find_by_share_name(share_name)
        .await?
        .ok_or_else(|| {
            ServerError::NotFound(format!("no directory currently carries share '{share_name}'"))
        })?;

    let transition = state.engine.close(access.directory_id, share_name).await?;
    Ok(Json(ShareActionResponse::from_transition(
        format!("share '{share_name}' removed"),
        transition,
    )))
}

#[utoipa::path(
    post,
    path = "/api/share/open-all",
    tag = "share",
    responses(
        (status = 200, description = "Aggregate report; per-directory failures listed", body = BulkReportResponse),
        (status = 500, description = "Catalog could not be read"),
    )
)]
pub async fn open_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BulkReportResponse>, ServerError> {
    let report = state.engine.open_all().await?;
    Ok(Json(report.to_response()))
}

#[utoipa::path(
    post,
    path = "/api/share/close-all",
    tag = "share",
    responses(
        (status = 200, description = "Aggregate report; per-directory failures listed", body = BulkReportResponse),
        (status = 500, description = "Catalog could not be read"),
    )
)]
pub async fn close_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BulkReportResponse>, ServerError> {
    let report = state.engine.close_all().await?;
    Ok(Json(report.to_response()))
}

#[utoipa::path(
    get,
    path = "/api/share",
    tag = "share",
    responses(
        (status = 200, description = "Currently shared directories", body = [SharedDirectoryResponse]),
        (status = 500, description = "Storage error"),
    )
)]
pub async fn list_shared(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SharedDirectoryResponse>>, ServerError> {
    let shared = state.engine.shared_directories().await?;
    Ok(Json(shared.iter().map(|s| s.to_response()).collect()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::db::sqlite::SqliteStore;
    use crate::engine::EngineError;

    /// State whose executor points at a tool that cannot be launched, so the
    /// OS boundary always reports a clean failure outcome.
    async fn state() -> Arc<AppState> {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let config = Config {
            bind_address: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            share_tool: "shareward-no-such-tool".into(),
            share_timeout_secs: 5,
            log_level: "info".into(),
            log_json: false,
            enable_swagger: false,
            cors_allowed_origins: None,
        };
        Arc::new(AppState::new(config, store))
    }

    #[tokio::test]
    async fn open_with_blank_fields_is_rejected() {
        let state = state().await;
        let req = OpenShareRequest { path: " ".into(), share_name: "Music".into() };
        let err = open_share(State(state.clone()), Json(req)).await.unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));

        let req = OpenShareRequest { path: "/srv/music".into(), share_name: "".into() };
        let err = open_share(State(state), Json(req)).await.unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn open_with_unknown_path_is_not_found() {
        let state = state().await;
        let req = OpenShareRequest { path: "/srv/unknown".into(), share_name: "Music".into() };
        let err = open_share(State(state), Json(req)).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_tool_surfaces_share_failure_and_leaves_state_untouched() {
        let state = state().await;
        state.store.insert_directory("Music", "/srv/music").await.unwrap();

        let req = OpenShareRequest { path: "/srv/music".into(), share_name: "Music".into() };
        let err = open_share(State(state.clone()), Json(req)).await.unwrap_err();
        assert!(matches!(err, ServerError::Engine(EngineError::ShareFailed { .. })));

        let Json(shared) = list_shared(State(state)).await.unwrap();
        assert!(shared.is_empty());
    }

    #[tokio::test]
    async fn close_with_unknown_share_name_is_not_found() {
        let state = state().await;
        let req = CloseShareRequest { share_name: "Ghost".into() };
        let err = close_share(State(state), Json(req)).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn close_resolves_directory_from_persisted_share_name() {
        let state = state().await;
        let dir = state.store.insert_directory("Music", "/srv/music").await.unwrap();
        // Simulate an earlier successful open.
        state
            .store
            .set_access(dir.id, true, "Music", chrono::Utc::now())
            .await
            .unwrap();

        // Resolution succeeds; the broken tool then fails the OS operation,
        // so the directory must remain marked shared.
        let req = CloseShareRequest { share_name: "Music".into() };
        let err = close_share(State(state.clone()), Json(req)).await.unwrap_err();
        assert!(matches!(err, ServerError::Engine(EngineError::ShareFailed { .. })));

        let Json(shared) = list_shared(State(state)).await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, dir.id);
    }

    #[tokio::test]
    async fn bulk_report_counts_every_directory() {
        let state = state().await;
        state.store.insert_directory("Music", "/srv/music").await.unwrap();
        state.store.insert_directory("Video", "/srv/video").await.unwrap();

        let Json(report) = open_all(State(state)).await.unwrap();
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 2);
        assert_eq!(report.failures.len(), 2);
    }
}
