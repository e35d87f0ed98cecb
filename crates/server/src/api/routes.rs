use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{callback, handlers, status};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Front-end routes, gated by the caller's session
    let session_routes = Router::new()
        .route("/status", get(status::poll_status))
        .route("/config", get(handlers::get_config))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Worker routes carry the shared secret in the body
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/callback", post(callback::receive_callback))
        .route("/sync", post(callback::receive_sync))
        .merge(session_routes)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
