//! File metadata records and repository.
//!
//! The repository enforces no tree rules; parent and type checks belong to
//! the upload pipeline.

use super::{FileType, PAGE_SIZE, ROOT_PARENT_ID};
use crate::db::DbPool;
use crate::{FilesError, Result};

/// A file tree entry as stored.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Owner.
    pub user_id: i64,
    /// Display name.
    pub name: String,
    /// Entry kind.
    #[sqlx(rename = "type", try_from = "String")]
    pub file_type: FileType,
    /// Readable without a session when true.
    pub is_public: bool,
    /// Parent folder ID, or [`ROOT_PARENT_ID`].
    pub parent_id: i64,
    /// Absolute path of the bytes on disk. `None` for folders.
    pub local_path: Option<String>,
}

impl FileRecord {
    /// True when the entry sits at the root.
    pub fn is_root_level(&self) -> bool {
        self.parent_id == ROOT_PARENT_ID
    }
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Owner.
    pub user_id: i64,
    /// Display name.
    pub name: String,
    /// Entry kind.
    pub file_type: FileType,
    /// Visibility.
    pub is_public: bool,
    /// Parent folder ID.
    pub parent_id: i64,
    /// Path of stored bytes.
    pub local_path: Option<String>,
}

impl NewFile {
    /// Create a private root-level entry.
    pub fn new(user_id: i64, name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            user_id,
            name: name.into(),
            file_type,
            is_public: false,
            parent_id: ROOT_PARENT_ID,
            local_path: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set visibility.
    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Set the path of the stored bytes.
    pub fn with_local_path(mut self, path: impl Into<String>) -> Self {
        self.local_path = Some(path.into());
        self
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, name, type, is_public, parent_id, local_path FROM files";

/// Repository for file metadata.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new entry and return its ID.
    pub async fn create(&self, file: &NewFile) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO files (user_id, name, type, is_public, parent_id, local_path)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(file.user_id)
        .bind(&file.name)
        .bind(file.file_type.as_str())
        .bind(file.is_public)
        .bind(file.parent_id)
        .bind(&file.local_path)
        .execute(self.pool)
        .await
        .map_err(|e| FilesError::Database(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// Find an entry by ID, optionally scoped to an owner.
    ///
    /// With an owner, a record owned by someone else is indistinguishable
    /// from a missing one.
    pub async fn find_by_id(&self, id: i64, owner: Option<i64>) -> Result<Option<FileRecord>> {
        let record = match owner {
            Some(user_id) => {
                sqlx::query_as::<_, FileRecord>(&format!(
                    "{SELECT_COLUMNS} WHERE id = ? AND user_id = ?"
                ))
                .bind(id)
                .bind(user_id)
                .fetch_optional(self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, FileRecord>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
                    .bind(id)
                    .fetch_optional(self.pool)
                    .await
            }
        }
        .map_err(|e| FilesError::Database(e.to_string()))?;

        Ok(record)
    }

    /// List an owner's entries under `parent_id`, in insertion order.
    ///
    /// Page `k` holds entries `[k * PAGE_SIZE, (k + 1) * PAGE_SIZE)`.
    pub async fn list_for_user(
        &self,
        owner: i64,
        parent_id: i64,
        page: i64,
    ) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ? AND parent_id = ? ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(owner)
        .bind(parent_id)
        .bind(PAGE_SIZE)
        .bind(page.max(0).saturating_mul(PAGE_SIZE))
        .fetch_all(self.pool)
        .await
        .map_err(|e| FilesError::Database(e.to_string()))?;

        Ok(records)
    }

    /// Set visibility. Returns false when no row has this ID.
    pub async fn set_visibility(&self, id: i64, is_public: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE files SET is_public = ? WHERE id = ?")
            .bind(is_public)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FilesError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all entries.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files")
            .fetch_one(self.pool)
            .await
            .map_err(|e| FilesError::Database(e.to_string()))?;

        Ok(count.0)
    }
}
