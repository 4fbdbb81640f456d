//! files-manager - access-controlled file storage.
//!
//! Users log in for short-lived session tokens, upload folders, files and
//! images into a per-user tree, control per-file visibility, and read back
//! content. Image uploads are resized into thumbnails by a background worker.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;
pub mod worker;

pub use auth::{
    hash_password, parse_basic_header, register, verify_credentials, verify_password,
    CredentialsError, PasswordError, RegistrationError, RegistrationRequest, SessionStore,
    SESSION_TTL_SECS,
};
pub use cache::{KeyValueStore, MemoryStore};
pub use config::Config;
pub use db::{Database, DbPool, NewUser, User, UserRepository};
pub use error::{FilesError, Result};
pub use file::{
    FileContent, FileRecord, FileRepository, FileService, FileStorage, FileType, NewFile,
    RetrievalError, UploadError, UploadPipeline, UploadRequest,
};
pub use web::{AppState, WebServer};
pub use worker::{ThumbnailJob, ThumbnailQueue, ThumbnailWorker, WorkerHandle};
