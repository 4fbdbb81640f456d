//! Router configuration for the HTTP API.

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    connect, create_user, disconnect, get_file, get_file_data, list_files, me, publish_file,
    stats, status, unpublish_file, upload_file, AppState,
};

/// Create the API router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let app_routes = Router::new()
        .route("/status", get(status))
        .route("/stats", get(stats));

    let auth_routes = Router::new()
        .route("/connect", get(connect))
        .route("/disconnect", get(disconnect));

    let user_routes = Router::new()
        .route("/users", post(create_user))
        .route("/users/me", get(me));

    let file_routes = Router::new()
        .route("/files", post(upload_file).get(list_files))
        .route("/files/:id", get(get_file))
        .route("/files/:id/publish", put(publish_file))
        .route("/files/:id/unpublish", put(unpublish_file))
        .route("/files/:id/data", get(get_file_data));

    Router::new()
        .merge(app_routes)
        .merge(auth_routes)
        .merge(user_routes)
        .merge(file_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}
