//! User model.

/// A registered user. Immutable after registration.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Email address, unique across users.
    pub email: String,
    /// Argon2 password hash.
    pub password: String,
    /// Registration timestamp.
    pub created_at: String,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Pre-hashed password (use `auth::hash_password`).
    pub password: String,
}

impl NewUser {
    /// Create a new user with an already hashed password.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password_hash.into(),
        }
    }
}
