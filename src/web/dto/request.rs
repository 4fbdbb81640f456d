//! Request DTOs.

use serde::Deserialize;

use crate::auth::RegistrationRequest;

/// `POST /users` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    /// Email address.
    pub email: Option<String>,
    /// Plaintext password.
    pub password: Option<String>,
}

impl From<RegisterRequest> for RegistrationRequest {
    fn from(req: RegisterRequest) -> Self {
        RegistrationRequest {
            email: req.email,
            password: req.password,
        }
    }
}

/// `GET /files` query.
///
/// Both fields are kept as text; parsing failures have their own meaning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    /// Parent folder ID; root when absent.
    pub parent_id: Option<String>,
    /// Zero-based page number.
    pub page: Option<String>,
}

/// `GET /files/:id/data` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileDataQuery {
    /// Derivative width.
    pub size: Option<String>,
}
