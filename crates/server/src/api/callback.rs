//! Worker-facing ingestion endpoints. Authenticated by the shared secret in
//! the body, not by the caller auth middleware.

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use super::handlers::ApiError;
use crate::metrics::AUTH_FAILURES_TOTAL;
use crate::state::AppState;
use gatelink_core::GatewayError;

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub status: &'static str,
    pub updated: usize,
}

fn count_rejection(endpoint: &str, error: &GatewayError) {
    if matches!(error, GatewayError::Authentication(_)) {
        AUTH_FAILURES_TOTAL
            .with_label_values(&[endpoint, "invalid_secret"])
            .inc();
    }
}

/// POST /api/v1/callback
///
/// 200 means "message accepted", even when the account behind a `connected`
/// message could not be saved.
pub async fn receive_callback(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AcceptedResponse>, ApiError> {
    state.gateway().receive_callback(&body).map_err(|e| {
        count_rejection("callback", &e);
        e
    })?;
    Ok(Json(AcceptedResponse { status: "ok" }))
}

/// POST /api/v1/sync
pub async fn receive_sync(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SyncResponse>, ApiError> {
    let updated = state.gateway().receive_sync(&body).map_err(|e| {
        count_rejection("sync", &e);
        e
    })?;
    Ok(Json(SyncResponse {
        status: "ok",
        updated,
    }))
}
