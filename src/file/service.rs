//! Access-controlled retrieval.
//!
//! Every read resolves the session first. Records owned by someone else are
//! reported as not found, so callers cannot probe for other users' IDs.

use std::num::IntErrorKind;

use thiserror::Error;
use tracing::{error, warn};

use super::{FileRecord, FileRepository, FileStorage, FileType, ROOT_PARENT_ID, THUMBNAIL_WIDTHS};
use crate::auth::SessionStore;
use crate::db::DbPool;
use crate::FilesError;

/// Reasons a read is rejected.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// No valid session.
    #[error("Unauthorized")]
    Unauthorized,

    /// Missing, not owned, private, or bytes absent on disk.
    #[error("Not found")]
    NotFound,

    /// Content requested for a folder.
    #[error("A folder doesn't have content")]
    FolderHasNoContent,

    /// Store failure.
    #[error(transparent)]
    Internal(#[from] FilesError),
}

/// Bytes of a file along with their media type.
#[derive(Debug, Clone)]
pub struct FileContent {
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// Media type guessed from the file name.
    pub content_type: String,
}

/// Read-side operations on the file tree.
pub struct FileService<'a> {
    pool: &'a DbPool,
    sessions: &'a SessionStore,
}

impl<'a> FileService<'a> {
    /// Create a new service.
    pub fn new(pool: &'a DbPool, sessions: &'a SessionStore) -> Self {
        Self { pool, sessions }
    }

    async fn authenticate(&self, token: Option<&str>) -> Result<i64, RetrievalError> {
        match token {
            Some(token) => self.sessions.resolve(token).await,
            None => None,
        }
        .ok_or(RetrievalError::Unauthorized)
    }

    fn parse_id(id: &str) -> Result<i64, RetrievalError> {
        id.trim().parse().map_err(|_| RetrievalError::NotFound)
    }

    /// Get one of the caller's own records.
    pub async fn show(&self, id: &str, token: Option<&str>) -> Result<FileRecord, RetrievalError> {
        let user_id = self.authenticate(token).await?;
        let id = Self::parse_id(id)?;

        FileRepository::new(self.pool)
            .find_by_id(id, Some(user_id))
            .await?
            .ok_or(RetrievalError::NotFound)
    }

    /// List one page of the caller's records under a parent.
    ///
    /// A missing parent means root. A parent or page that does not parse
    /// yields an empty page and page 0 respectively. Store failures degrade
    /// to an empty page.
    pub async fn index(
        &self,
        token: Option<&str>,
        parent_id: Option<&str>,
        page: Option<&str>,
    ) -> Result<Vec<FileRecord>, RetrievalError> {
        let user_id = self.authenticate(token).await?;

        let parent_id = match parent_id.map(str::trim).filter(|p| !p.is_empty()) {
            None => ROOT_PARENT_ID,
            Some(p) => match p.parse() {
                Ok(id) => id,
                Err(_) => return Ok(Vec::new()),
            },
        };
        let page = page.map_or(0, parse_page);

        match FileRepository::new(self.pool)
            .list_for_user(user_id, parent_id, page)
            .await
        {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(user_id, "Listing failed, returning empty page: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Set visibility on one of the caller's records and return it refreshed.
    pub async fn set_published(
        &self,
        id: &str,
        token: Option<&str>,
        is_public: bool,
    ) -> Result<FileRecord, RetrievalError> {
        let user_id = self.authenticate(token).await?;
        let id = Self::parse_id(id)?;
        let repo = FileRepository::new(self.pool);

        repo.find_by_id(id, Some(user_id))
            .await?
            .ok_or(RetrievalError::NotFound)?;
        repo.set_visibility(id, is_public).await?;

        repo.find_by_id(id, Some(user_id))
            .await?
            .ok_or(RetrievalError::NotFound)
    }

    /// Read the bytes of a file, or of one of an image's derivatives.
    ///
    /// Public files need no session. A `size` that is not one of
    /// [`THUMBNAIL_WIDTHS`] falls back to the original.
    pub async fn get_content(
        &self,
        id: &str,
        token: Option<&str>,
        size: Option<&str>,
    ) -> Result<FileContent, RetrievalError> {
        let id = Self::parse_id(id)?;
        let record = FileRepository::new(self.pool)
            .find_by_id(id, None)
            .await?
            .ok_or(RetrievalError::NotFound)?;

        if record.file_type == FileType::Folder {
            return Err(RetrievalError::FolderHasNoContent);
        }

        if !record.is_public {
            let owner = match token {
                Some(token) => self.sessions.resolve(token).await,
                None => None,
            };
            if owner != Some(record.user_id) {
                return Err(RetrievalError::NotFound);
            }
        }

        let Some(original) = record.local_path.as_deref() else {
            error!(file_id = record.id, "Content record without local path");
            return Err(RetrievalError::NotFound);
        };

        let width = size
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|w| THUMBNAIL_WIDTHS.contains(w));
        let path = match width {
            Some(width) if record.file_type == FileType::Image => {
                FileStorage::derivative_path(original, width)
            }
            _ => original.into(),
        };

        let bytes = FileStorage::read(&path)
            .await?
            .ok_or(RetrievalError::NotFound)?;
        let content_type = mime_guess::from_path(&record.name)
            .first_or_octet_stream()
            .to_string();

        Ok(FileContent {
            bytes,
            content_type,
        })
    }
}

/// Page number from a query string. Non-numeric text is page 0; a number
/// too large for `i64` is clamped so it lands past the end.
fn parse_page(page: &str) -> i64 {
    match page.trim().parse::<i64>() {
        Ok(n) => n.max(0),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => i64::MAX,
        Err(_) => 0,
    }
}
