//! Request extractors.

mod auth;

pub use auth::{AuthUser, SessionToken, TOKEN_HEADER};
