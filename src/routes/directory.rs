//! Directory catalog endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::db::DirectoryStore;
use crate::error::ServerError;
use crate::schemas::MessageResponse;
use crate::schemas::directory::{CreateDirectoryRequest, DirectoryResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_directories, create_directory, delete_directory),
    components(schemas(CreateDirectoryRequest, DirectoryResponse, MessageResponse))
)]
pub struct DirectoryApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/directory", get(list_directories).post(create_directory))
        .route("/directory/{id}", delete(delete_directory))
}

#[utoipa::path(
    get,
    path = "/api/directory",
    tag = "directory",
    responses(
        (status = 200, description = "Catalog listed", body = [DirectoryResponse]),
        (status = 500, description = "Storage error"),
    )
)]
pub async fn list_directories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DirectoryResponse>>, ServerError> {
    let records = state.store.list_directories().await?;
    Ok(Json(records.iter().map(|r| r.to_response()).collect()))
}

#[utoipa::path(
    post,
    path = "/api/directory",
    tag = "directory",
    request_body = CreateDirectoryRequest,
    responses(
        (status = 200, description = "Directory created", body = MessageResponse),
        (status = 400, description = "Blank name or path"),
        (status = 409, description = "Browse path already cataloged"),
        (status = 500, description = "Storage error"),
    )
)]
pub async fn create_directory(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDirectoryRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    let name = req.name.trim();
    let browse = req.browse.trim();
    if name.is_empty() {
        return Err(ServerError::BadRequest("name must not be empty".into()));
    }
    if browse.is_empty() {
        return Err(ServerError::BadRequest("browse must not be empty".into()));
    }

    let record = state.store.insert_directory(name, browse).await.map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            ServerError::Conflict(format!("browse path '{browse}' is already cataloged"))
        } else {
            ServerError::Database(e)
        }
    })?;

    info!(id = record.id, browse = %record.browse, "directory cataloged");
    Ok(Json(MessageResponse::new(format!(
        "directory '{}' created with id {}",
        record.name, record.id
    ))))
}

#[utoipa::path(
    delete,
    path = "/api/directory/{id}",
    tag = "directory",
    params(
        ("id" = i64, Path, description = "Catalog id of the directory to delete")
    ),
    responses(
        (status = 200, description = "Delete attempted; message reports rows affected", body = MessageResponse),
        (status = 500, description = "Storage error"),
    )
)]
pub async fn delete_directory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    // Deleting an unknown id is a no-op, not an error; the message carries
    // the affected row count so callers can tell the difference.
    let rows = state.store.delete_directory(id).await?;
    info!(id, rows, "directory delete");
    Ok(Json(MessageResponse::new(format!(
        "{rows} directory row(s) deleted"
    ))))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
