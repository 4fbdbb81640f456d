//! Response DTOs.

use serde::Serialize;

use crate::db::User;
use crate::file::FileRecord;

/// `GET /connect` response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Session token for the `X-Token` header.
    pub token: String,
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID.
    pub id: i64,
    /// Email address.
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// Public view of a file record. The on-disk path is never exposed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    /// File ID.
    pub id: i64,
    /// Owner ID.
    pub user_id: i64,
    /// Display name.
    pub name: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub file_type: &'static str,
    /// Visibility.
    pub is_public: bool,
    /// Parent folder ID, 0 at root.
    pub parent_id: i64,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            file_type: record.file_type.as_str(),
            is_public: record.is_public,
            parent_id: record.parent_id,
        }
    }
}

/// `GET /status` response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Key-value store reachable.
    pub redis: bool,
    /// Document store reachable.
    pub db: bool,
}

/// `GET /stats` response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Number of users.
    pub users: i64,
    /// Number of file records.
    pub files: i64,
}
