//! Token sessions backed by the key-value store.
//!
//! A session is a single key `auth_<token>` holding the user id, written with
//! a fixed TTL at login. Its presence in the store is the only proof of
//! authentication; there is no sliding expiration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::KeyValueStore;
use crate::logging::redact_token;
use crate::Result;

/// Session lifetime in seconds (24 hours).
pub const SESSION_TTL_SECS: u64 = 24 * 60 * 60;

const KEY_PREFIX: &str = "auth_";

/// Issues, resolves and revokes session tokens.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a session store with the standard 24h TTL.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(store, Duration::from_secs(SESSION_TTL_SECS))
    }

    /// Create a session store with a custom TTL.
    pub fn with_ttl(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(token: &str) -> String {
        format!("{KEY_PREFIX}{token}")
    }

    /// Issue a new token for `user_id`.
    ///
    /// A user may hold several sessions at once.
    pub async fn issue(&self, user_id: i64) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        self.store
            .set_ex(&Self::key(&token), &user_id.to_string(), self.ttl)
            .await?;

        debug!(user_id, token = %redact_token(&token), "Session issued");
        Ok(token)
    }

    /// Resolve a token to its user id.
    ///
    /// Returns `None` for unknown, expired or malformed tokens, and when the
    /// store cannot be reached.
    pub async fn resolve(&self, token: &str) -> Option<i64> {
        if Uuid::parse_str(token).is_err() {
            return None;
        }

        match self.store.get(&Self::key(token)).await {
            Ok(value) => value.and_then(|v| v.parse().ok()),
            Err(e) => {
                warn!(token = %redact_token(token), "Session lookup failed: {}", e);
                None
            }
        }
    }

    /// Revoke a token. Revoking an unknown token succeeds.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        self.store.del(&Self::key(token)).await?;
        debug!(token = %redact_token(token), "Session revoked");
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("ttl", &self.ttl).finish()
    }
}
