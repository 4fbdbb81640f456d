//! Health and statistics handlers.

use std::sync::Arc;

use axum::{extract::State, Json};

use super::AppState;
use crate::db::UserRepository;
use crate::file::FileRepository;
use crate::web::dto::{StatsResponse, StatusResponse};
use crate::web::error::ApiError;

/// GET /status - Reachability of both stores.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (redis, db) = tokio::join!(state.cache.is_alive(), state.db.is_alive());
    Json(StatusResponse { redis, db })
}

/// GET /stats - Number of users and files.
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let users = UserRepository::new(state.db.pool()).count().await?;
    let files = FileRepository::new(state.db.pool()).count().await?;

    Ok(Json(StatsResponse { users, files }))
}
