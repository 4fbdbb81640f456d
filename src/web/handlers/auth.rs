//! Login and logout handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use tracing::info;

use super::AppState;
use crate::auth::{parse_basic_header, verify_credentials};
use crate::web::dto::TokenResponse;
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// GET /connect - Exchange Basic credentials for a session token.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(ApiError::unauthorized)?;

    let (email, password) = parse_basic_header(header)?;
    let user = verify_credentials(state.db.pool(), &email, &password).await?;
    let token = state.sessions.issue(user.id).await?;

    info!(user_id = user.id, "User connected");
    Ok(Json(TokenResponse { token }))
}

/// GET /disconnect - Revoke the current session.
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    state.sessions.revoke(&auth.token).await?;

    info!(user_id = auth.user_id, "User disconnected");
    Ok(StatusCode::NO_CONTENT)
}
