//! Session token extractors.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::logging::redact_token;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "X-Token";

/// The raw session token from the `X-Token` header, if any.
///
/// Never rejects; handlers that allow anonymous access resolve it themselves.
#[derive(Debug, Clone, Default)]
pub struct SessionToken(pub Option<String>);

impl SessionToken {
    /// Borrow the token.
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(SessionToken(token))
    }
}

/// Extractor for authenticated users.
///
/// Rejects with 401 unless `X-Token` names a live session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Authenticated user ID.
    pub user_id: i64,
    /// The token that authenticated the request.
    pub token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Ok(SessionToken(Some(token))) = SessionToken::from_request_parts(parts, state).await
        else {
            return Err(ApiError::unauthorized());
        };

        match state.sessions.resolve(&token).await {
            Some(user_id) => Ok(AuthUser { user_id, token }),
            None => {
                tracing::debug!(token = %redact_token(&token), "Rejected unknown session");
                Err(ApiError::unauthorized())
            }
        }
    }
}
