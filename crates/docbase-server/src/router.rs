use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::server::Server;

/// Build the axum router with all docbase endpoints.
pub fn build_router(server: Arc<Server>) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/db/:collection/:id", get(handler::get_handler))
        .route("/v1/db/update", post(handler::update_handler))
        .route("/v1/db/delete", post(handler::delete_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}
