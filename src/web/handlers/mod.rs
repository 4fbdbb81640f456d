//! API handlers.

pub mod app;
pub mod auth;
pub mod file;
pub mod user;

pub use app::*;
pub use auth::*;
pub use file::*;
pub use user::*;

use std::sync::Arc;

use crate::auth::SessionStore;
use crate::cache::KeyValueStore;
use crate::db::Database;
use crate::file::FileStorage;
use crate::worker::ThumbnailQueue;

/// Shared state for all handlers.
pub struct AppState {
    /// Document store.
    pub db: Arc<Database>,
    /// Key-value store backing sessions.
    pub cache: Arc<dyn KeyValueStore>,
    /// Session tokens.
    pub sessions: SessionStore,
    /// Uploaded bytes.
    pub storage: FileStorage,
    /// Thumbnail job producer.
    pub queue: ThumbnailQueue,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Arc<Database>,
        cache: Arc<dyn KeyValueStore>,
        storage: FileStorage,
        queue: ThumbnailQueue,
    ) -> Self {
        Self {
            sessions: SessionStore::new(cache.clone()),
            db,
            cache,
            storage,
            queue,
        }
    }
}
