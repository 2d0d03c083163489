//! Torrent lifecycle API handlers.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use driftwood_core::{
    AddOutcome, GrantError, LifecycleError, MergedTorrentView, Principal, ReconcileError,
    TorrentRecord,
};

use super::{error_response, ErrorResponse};
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddFromLinkRequest {
    /// Magnet link or URL of a remote .torrent file.
    pub link: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemTokenParams {
    /// Scope path for the token; defaults to the record's created name.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TorrentListResponse {
    pub torrents: Vec<MergedTorrentView>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// ============================================================================
// Error mapping
// ============================================================================

fn reconcile_error(e: ReconcileError) -> ApiError {
    match e {
        // The engine is reachable-but-inconsistent or unreachable; either
        // way the fault is upstream of this service.
        ReconcileError::EngineFault { .. } | ReconcileError::Engine(_) => {
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
        ReconcileError::Store(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn lifecycle_error(e: LifecycleError) -> ApiError {
    match e {
        LifecycleError::Engine(_) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
        LifecycleError::Store(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn grant_error(e: GrantError) -> ApiError {
    match e {
        GrantError::EngineFault { .. } | GrantError::Engine(_) => {
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
        GrantError::Store(_) | GrantError::Token(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn add_outcome(outcome: AddOutcome) -> Result<(StatusCode, Json<TorrentRecord>), ApiError> {
    match outcome {
        AddOutcome::Created(record) => Ok((StatusCode::CREATED, Json(record))),
        AddOutcome::AlreadyExists { .. } => Err(error_response(
            StatusCode::CONFLICT,
            "Torrent already exists",
        )),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/torrents
///
/// List all records merged with live engine status.
pub async fn list_torrents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TorrentListResponse>, ApiError> {
    let torrents = state
        .reconciler()
        .list_merged()
        .await
        .map_err(reconcile_error)?;

    let count = torrents.len();
    Ok(Json(TorrentListResponse { torrents, count }))
}

/// GET /api/v1/torrents/{id}
pub async fn get_torrent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MergedTorrentView>, ApiError> {
    state
        .reconciler()
        .get_merged(id)
        .await
        .map_err(reconcile_error)?
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Torrent not found: {}", id)))
}

/// POST /api/v1/torrents/link
///
/// Add a torrent via magnet link or remote URL.
pub async fn add_from_link(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<AddFromLinkRequest>,
) -> Result<(StatusCode, Json<TorrentRecord>), ApiError> {
    let outcome = state
        .coordinator()
        .add_from_url(&principal.id, &body.link)
        .await
        .map_err(lifecycle_error)?;

    add_outcome(outcome)
}

/// POST /api/v1/torrents/file
///
/// Add a torrent from an uploaded .torrent file (multipart field `file`).
pub async fn add_from_file(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<TorrentRecord>), ApiError> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;
            upload = Some(bytes.to_vec());
            break;
        }
    }

    let data = upload.ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "Missing multipart field: file")
    })?;

    // The engine client takes a path, so spool the upload to disk for the
    // duration of the ingest.
    let path = std::env::temp_dir().join(format!("driftwood-upload-{}.torrent", Uuid::new_v4()));
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let result = state
        .coordinator()
        .add_from_file(&principal.id, &path)
        .await;

    let _ = tokio::fs::remove_file(&path).await;

    add_outcome(result.map_err(lifecycle_error)?)
}

/// DELETE /api/v1/torrents/{id}
pub async fn remove_torrent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .coordinator()
        .remove(id)
        .await
        .map_err(lifecycle_error)?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Torrent not found: {}", id),
        ))
    }
}

/// GET /api/v1/torrents/{id}/files/{index}/token
///
/// Issue a capability token for one file, addressed by index into the
/// engine's file list.
pub async fn file_token(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(i64, usize)>,
) -> Result<Json<TokenResponse>, ApiError> {
    state
        .coordinator()
        .grant_file_token(id, index)
        .await
        .map_err(grant_error)?
        .map(|token| Json(TokenResponse { token }))
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                format!("No file {} on torrent {}", index, id),
            )
        })
}

/// GET /api/v1/torrents/{id}/token
///
/// Issue a capability token for the whole torrent.
pub async fn item_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<ItemTokenParams>,
) -> Result<Json<TokenResponse>, ApiError> {
    state
        .coordinator()
        .grant_item_token(id, params.path)
        .await
        .map_err(grant_error)?
        .map(|token| Json(TokenResponse { token }))
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Torrent not found: {}", id)))
}
