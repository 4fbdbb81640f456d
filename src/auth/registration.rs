//! User registration.

use thiserror::Error;
use tracing::info;

use crate::auth::{hash_password, PasswordError};
use crate::db::{DbPool, NewUser, User, UserRepository};
use crate::FilesError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// No email supplied.
    #[error("Missing email")]
    MissingEmail,

    /// No password supplied.
    #[error("Missing password")]
    MissingPassword,

    /// Email already registered.
    #[error("Already exist")]
    AlreadyExists,

    /// Password rejected or hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] FilesError),
}

/// Registration request data.
#[derive(Debug, Clone, Default)]
pub struct RegistrationRequest {
    /// Email address.
    pub email: Option<String>,
    /// Plaintext password.
    pub password: Option<String>,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }
}

/// Register a new user.
///
/// Checks run in order: email present, password present, email unused.
pub async fn register(
    pool: &DbPool,
    request: &RegistrationRequest,
) -> Result<User, RegistrationError> {
    let email = request
        .email
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or(RegistrationError::MissingEmail)?;
    let password = request
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(RegistrationError::MissingPassword)?;

    let repo = UserRepository::new(pool);
    if repo.email_exists(email).await? {
        return Err(RegistrationError::AlreadyExists);
    }

    let password_hash = hash_password(password)?;
    let user = repo
        .create(&NewUser::new(email, password_hash))
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration of the same email.
            FilesError::Database(msg) if msg.contains("UNIQUE") => RegistrationError::AlreadyExists,
            other => RegistrationError::Store(other),
        })?;

    info!(user_id = user.id, "User registered");
    Ok(user)
}
