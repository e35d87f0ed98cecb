use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::handlers::ApiError;
use super::middleware::AuthUser;
use crate::state::AppState;
use gatelink_core::{GatewayError, StatusReply};

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "correlationId", default)]
    pub correlation_id: Option<String>,
}

/// GET /api/v1/status?correlationId=...
///
/// Returns the stored message and deletes it, or `{status: "pending"}`.
pub async fn poll_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusReply>, ApiError> {
    // Absent id is treated like a bad session, as on the callback side
    let correlation_id = query.correlation_id.unwrap_or_default();
    if correlation_id.is_empty() {
        return Err(GatewayError::Authentication("Missing correlationId".to_string()).into());
    }

    let reply = state.gateway().poll_status(&correlation_id)?;
    debug!(
        user = %user_id,
        correlation_id = %correlation_id,
        pending = reply.is_pending(),
        "Status polled"
    );
    Ok(Json(reply))
}
