//! HTTP API.
//!
//! Clients authenticate with Basic credentials on `/connect` and then send
//! the returned token in the `X-Token` header.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
