//! User handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::AppState;
use crate::auth::register;
use crate::db::UserRepository;
use crate::web::dto::{RegisterRequest, UserResponse};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// POST /users - Register a new user.
///
/// A missing or unparsable body is treated as an empty one.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Option<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let user = register(state.db.pool(), &req.into()).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users/me - The authenticated user.
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(auth.user_id)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    Ok(Json(user.into()))
}
