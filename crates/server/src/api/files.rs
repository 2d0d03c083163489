//! Capability token resolution.
//!
//! The retrieval layer presents a token instead of a session; this endpoint
//! resolves it back to the scope it grants. It is deliberately outside the
//! auth middleware: the token is the credential.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use driftwood_core::FileGrant;

use super::{error_response, ErrorResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ClaimsParams {
    pub token: String,
}

/// GET /api/v1/files/claims?token=...
///
/// Returns the `{hash_string, file_path}` scope of a valid token. A token
/// is verified structurally only; whether the torrent still exists is the
/// next layer's concern.
pub async fn resolve_claims(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClaimsParams>,
) -> Result<Json<FileGrant>, (StatusCode, Json<ErrorResponse>)> {
    state
        .tokens()
        .verify(&params.token)
        .map(Json)
        .map_err(|e| error_response(StatusCode::UNAUTHORIZED, e.to_string()))
}
