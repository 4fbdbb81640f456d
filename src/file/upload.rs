//! Upload pipeline.
//!
//! Validation runs in a fixed order and stops at the first failure:
//! session, name, type, data presence, parent. Only then is the payload
//! decoded, the bytes written and the metadata stored. Image uploads finally
//! enqueue a thumbnail job; a failed enqueue is logged and does not undo the
//! upload.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use super::{FileRecord, FileRepository, FileStorage, FileType, NewFile, ROOT_PARENT_ID};
use crate::auth::SessionStore;
use crate::db::DbPool;
use crate::worker::{ThumbnailJob, ThumbnailQueue};
use crate::FilesError;

/// Payload decoder: padding optional, stray trailing bits ignored.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Reasons an upload is rejected.
#[derive(Error, Debug)]
pub enum UploadError {
    /// No valid session.
    #[error("Unauthorized")]
    Unauthorized,

    /// `name` absent or empty.
    #[error("Missing name")]
    MissingName,

    /// `type` absent or not one of folder, file, image.
    #[error("Missing type")]
    MissingType,

    /// `data` absent or empty on a file or image.
    #[error("Missing data")]
    MissingData,

    /// `parentId` does not name an existing entry.
    #[error("Parent not found")]
    ParentNotFound,

    /// `parentId` names an entry that is not a folder.
    #[error("Parent is not a folder")]
    ParentNotFolder,

    /// Writing bytes or metadata failed.
    #[error(transparent)]
    Storage(#[from] FilesError),
}

/// Parent reference as sent by clients: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ParentRef {
    /// Numeric ID.
    Id(i64),
    /// ID as text.
    Text(String),
}

impl ParentRef {
    /// Numeric ID, or `None` when the text is not a number.
    ///
    /// Blank text names the root.
    pub fn id(&self) -> Option<i64> {
        match self {
            ParentRef::Id(id) => Some(*id),
            ParentRef::Text(text) if text.trim().is_empty() => Some(ROOT_PARENT_ID),
            ParentRef::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// An upload as received from a client.
///
/// Each field is read on its own, so a badly typed field never hides the
/// others: it reads as absent (or, for `parentId`, as an unknown parent).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Display name.
    #[serde(default, deserialize_with = "name_field")]
    pub name: Option<String>,
    /// `folder`, `file` or `image`.
    #[serde(rename = "type", default, deserialize_with = "text_field")]
    pub file_type: Option<String>,
    /// Parent folder; root when absent.
    #[serde(default, deserialize_with = "parent_field")]
    pub parent_id: Option<ParentRef>,
    /// Visibility; private when absent.
    #[serde(default, deserialize_with = "flag_field")]
    pub is_public: Option<bool>,
    /// Base64 content, required unless the type is folder.
    #[serde(default, deserialize_with = "text_field")]
    pub data: Option<String>,
}

fn text_field<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn name_field<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn parent_field<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ParentRef>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) => Some(match n.as_i64() {
            Some(id) => ParentRef::Id(id),
            None => ParentRef::Text(n.to_string()),
        }),
        Value::String(s) => Some(ParentRef::Text(s)),
        other => Some(ParentRef::Text(other.to_string())),
    })
}

fn flag_field<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => Some(matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        )),
        _ => None,
    })
}

/// Decode a base64 payload the way lenient decoders do: URL-safe symbols are
/// mapped, anything outside the alphabet (whitespace, padding) is skipped,
/// and a dangling final symbol is dropped.
pub fn decode_payload(data: &str) -> Vec<u8> {
    let mut symbols: String = data
        .chars()
        .filter_map(|c| match c {
            '-' => Some('+'),
            '_' => Some('/'),
            c if c.is_ascii_alphanumeric() || c == '+' || c == '/' => Some(c),
            _ => None,
        })
        .collect();
    if symbols.len() % 4 == 1 {
        symbols.pop();
    }

    LENIENT.decode(symbols).unwrap_or_default()
}

impl UploadRequest {
    /// Start a request for `name` of `file_type`.
    pub fn new(name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            name: Some(name.into()),
            file_type: Some(file_type.as_str().to_string()),
            ..Default::default()
        }
    }

    /// Attach base64 content.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Place the entry under `parent_id`.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(ParentRef::Id(parent_id));
        self
    }

    /// Set visibility.
    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = Some(is_public);
        self
    }
}

/// Validated upload, ready to persist.
struct ValidUpload<'r> {
    user_id: i64,
    name: &'r str,
    file_type: FileType,
    data: Option<&'r str>,
    parent_id: i64,
    is_public: bool,
}

/// Validates and persists uploads.
pub struct UploadPipeline<'a> {
    pool: &'a DbPool,
    sessions: &'a SessionStore,
    storage: &'a FileStorage,
    queue: &'a ThumbnailQueue,
}

impl<'a> UploadPipeline<'a> {
    /// Create a pipeline over the given stores.
    pub fn new(
        pool: &'a DbPool,
        sessions: &'a SessionStore,
        storage: &'a FileStorage,
        queue: &'a ThumbnailQueue,
    ) -> Self {
        Self {
            pool,
            sessions,
            storage,
            queue,
        }
    }

    /// Run an upload to completion.
    pub async fn upload(
        &self,
        token: Option<&str>,
        request: &UploadRequest,
    ) -> Result<FileRecord, UploadError> {
        let upload = self.validate(token, request).await?;
        let record = self.persist(upload).await?;

        if record.file_type == FileType::Image {
            let job = ThumbnailJob::new(record.user_id, record.id);
            if let Err(e) = self.queue.enqueue(job) {
                warn!(file_id = record.id, "Failed to enqueue thumbnail job: {}", e);
            }
        }

        Ok(record)
    }

    async fn validate<'r>(
        &self,
        token: Option<&str>,
        request: &'r UploadRequest,
    ) -> Result<ValidUpload<'r>, UploadError> {
        let user_id = match token {
            Some(token) => self.sessions.resolve(token).await,
            None => None,
        }
        .ok_or(UploadError::Unauthorized)?;

        let name = request
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or(UploadError::MissingName)?;

        let file_type: FileType = request
            .file_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .ok_or(UploadError::MissingType)?;

        let data = if file_type.has_content() {
            Some(
                request
                    .data
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .ok_or(UploadError::MissingData)?,
            )
        } else {
            None
        };

        let parent_id = self.resolve_parent(request.parent_id.as_ref()).await?;

        Ok(ValidUpload {
            user_id,
            name,
            file_type,
            data,
            parent_id,
            is_public: request.is_public.unwrap_or(false),
        })
    }

    /// Root passes. Anything else must exist and be a folder.
    async fn resolve_parent(&self, parent: Option<&ParentRef>) -> Result<i64, UploadError> {
        let Some(parent) = parent else {
            return Ok(ROOT_PARENT_ID);
        };
        let parent_id = parent.id().ok_or(UploadError::ParentNotFound)?;
        if parent_id == ROOT_PARENT_ID {
            return Ok(ROOT_PARENT_ID);
        }

        let record = FileRepository::new(self.pool)
            .find_by_id(parent_id, None)
            .await?
            .ok_or(UploadError::ParentNotFound)?;
        if record.file_type != FileType::Folder {
            return Err(UploadError::ParentNotFolder);
        }

        Ok(parent_id)
    }

    async fn persist(&self, upload: ValidUpload<'_>) -> Result<FileRecord, UploadError> {
        let mut new_file = NewFile::new(upload.user_id, upload.name, upload.file_type)
            .with_parent(upload.parent_id)
            .with_public(upload.is_public);

        if let Some(data) = upload.data {
            let path = self.storage.save(&decode_payload(data)).await?;
            new_file = new_file.with_local_path(path.to_string_lossy());
        }

        let id = FileRepository::new(self.pool).create(&new_file).await?;
        info!(
            user_id = upload.user_id,
            file_id = id,
            file_type = %upload.file_type,
            "File uploaded"
        );

        Ok(FileRecord {
            id,
            user_id: new_file.user_id,
            name: new_file.name,
            file_type: new_file.file_type,
            is_public: new_file.is_public,
            parent_id: new_file.parent_id,
            local_path: new_file.local_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::db::Database;
    use crate::worker::JobReceiver;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        db: Database,
        sessions: SessionStore,
        storage: FileStorage,
        queue: ThumbnailQueue,
        jobs: JobReceiver,
        _dir: TempDir,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let (queue, jobs) = ThumbnailQueue::new(3);
            Self {
                db: Database::open_in_memory().await.unwrap(),
                sessions: SessionStore::new(Arc::new(MemoryStore::new())),
                storage: FileStorage::new(dir.path().join("files")),
                queue,
                jobs,
                _dir: dir,
            }
        }

        fn pipeline(&self) -> UploadPipeline<'_> {
            UploadPipeline::new(self.db.pool(), &self.sessions, &self.storage, &self.queue)
        }
    }

    #[tokio::test]
    async fn test_upload_folder() {
        let fx = Fixture::new().await;
        let token = fx.sessions.issue(1).await.unwrap();

        let record = fx
            .pipeline()
            .upload(Some(&token), &UploadRequest::new("Docs", FileType::Folder))
            .await
            .unwrap();

        assert_eq!(record.user_id, 1);
        assert_eq!(record.file_type, FileType::Folder);
        assert_eq!(record.parent_id, ROOT_PARENT_ID);
        assert!(record.local_path.is_none());
        assert!(!fx.storage.base_path().exists());
    }

    #[tokio::test]
    async fn test_upload_file_under_folder() {
        let fx = Fixture::new().await;
        let token = fx.sessions.issue(1).await.unwrap();
        let pipeline = fx.pipeline();

        let folder = pipeline
            .upload(Some(&token), &UploadRequest::new("Docs", FileType::Folder))
            .await
            .unwrap();
        let file = pipeline
            .upload(
                Some(&token),
                &UploadRequest::new("a.txt", FileType::File)
                    .with_data("aGVsbG8=")
                    .with_parent(folder.id),
            )
            .await
            .unwrap();

        assert_eq!(file.parent_id, folder.id);
        let path = file.local_path.unwrap();
        assert_eq!(FileStorage::read(&path).await.unwrap().unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_upload_image_enqueues_job() {
        let mut fx = Fixture::new().await;
        let token = fx.sessions.issue(4).await.unwrap();

        let record = fx
            .pipeline()
            .upload(
                Some(&token),
                &UploadRequest::new("a.png", FileType::Image).with_data("aGVsbG8="),
            )
            .await
            .unwrap();

        let delivery = fx.jobs.recv().await.unwrap();
        assert_eq!(delivery.job, ThumbnailJob::new(4, record.id));
    }

    #[tokio::test]
    async fn test_upload_survives_closed_queue() {
        let fx = Fixture::new().await;
        let token = fx.sessions.issue(1).await.unwrap();
        fx.queue.close();

        let record = fx
            .pipeline()
            .upload(
                Some(&token),
                &UploadRequest::new("a.png", FileType::Image).with_data("aGVsbG8="),
            )
            .await
            .unwrap();
        assert!(record.local_path.is_some());
    }

    #[tokio::test]
    async fn test_upload_unauthorized() {
        let fx = Fixture::new().await;
        let request = UploadRequest::new("Docs", FileType::Folder);

        assert!(matches!(
            fx.pipeline().upload(None, &request).await,
            Err(UploadError::Unauthorized)
        ));
        assert!(matches!(
            fx.pipeline()
                .upload(Some("0f8fad5b-d9cb-469f-a165-70867728950e"), &request)
                .await,
            Err(UploadError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_upload_validation_order() {
        let fx = Fixture::new().await;
        let token = fx.sessions.issue(1).await.unwrap();
        let pipeline = fx.pipeline();

        // Name is checked before type.
        let request = UploadRequest {
            file_type: Some("bogus".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            pipeline.upload(Some(&token), &request).await,
            Err(UploadError::MissingName)
        ));

        let request = UploadRequest {
            name: Some("x".to_string()),
            file_type: Some("video".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            pipeline.upload(Some(&token), &request).await,
            Err(UploadError::MissingType)
        ));

        // Data is checked before parent.
        let request = UploadRequest::new("a.txt", FileType::File).with_parent(999);
        assert!(matches!(
            pipeline.upload(Some(&token), &request).await,
            Err(UploadError::MissingData)
        ));

        // Parent is checked before the payload is decoded.
        let request = UploadRequest::new("a.txt", FileType::File)
            .with_data("%%%")
            .with_parent(999);
        assert!(matches!(
            pipeline.upload(Some(&token), &request).await,
            Err(UploadError::ParentNotFound)
        ));
    }

    #[tokio::test]
    async fn test_upload_lenient_base64() {
        let fx = Fixture::new().await;
        let token = fx.sessions.issue(1).await.unwrap();
        let pipeline = fx.pipeline();

        for data in ["aGVsbG8", "aGVs\nbG8=", " aGVs bG8=\r\n", "aGVsbG8=="] {
            let file = pipeline
                .upload(
                    Some(&token),
                    &UploadRequest::new("a.txt", FileType::File).with_data(data),
                )
                .await
                .unwrap();
            let path = file.local_path.unwrap();
            assert_eq!(
                FileStorage::read(&path).await.unwrap().unwrap(),
                b"hello",
                "{data:?}"
            );
        }
    }

    #[test]
    fn test_decode_payload() {
        assert_eq!(decode_payload("aGVsbG8="), b"hello");
        assert_eq!(decode_payload("aGk"), b"hi");
        assert_eq!(decode_payload("aGVsbG8\n\n"), b"hello");
        assert_eq!(decode_payload("-_8="), decode_payload("+/8="));
        assert!(decode_payload("%%%").is_empty());
    }

    #[tokio::test]
    async fn test_upload_blank_parent_is_root() {
        let fx = Fixture::new().await;
        let token = fx.sessions.issue(1).await.unwrap();

        let mut request = UploadRequest::new("Docs", FileType::Folder);
        request.parent_id = Some(ParentRef::Text("  ".to_string()));
        let record = fx.pipeline().upload(Some(&token), &request).await.unwrap();

        assert_eq!(record.parent_id, ROOT_PARENT_ID);
    }

    #[tokio::test]
    async fn test_upload_parent_errors() {
        let fx = Fixture::new().await;
        let token = fx.sessions.issue(1).await.unwrap();
        let pipeline = fx.pipeline();

        let request = UploadRequest::new("Sub", FileType::Folder).with_parent(999);
        assert!(matches!(
            pipeline.upload(Some(&token), &request).await,
            Err(UploadError::ParentNotFound)
        ));

        let mut request = UploadRequest::new("Sub", FileType::Folder);
        request.parent_id = Some(ParentRef::Text("abc".to_string()));
        assert!(matches!(
            pipeline.upload(Some(&token), &request).await,
            Err(UploadError::ParentNotFound)
        ));

        let file = pipeline
            .upload(
                Some(&token),
                &UploadRequest::new("a.txt", FileType::File).with_data("aGVsbG8="),
            )
            .await
            .unwrap();
        let request = UploadRequest::new("Sub", FileType::Folder).with_parent(file.id);
        assert!(matches!(
            pipeline.upload(Some(&token), &request).await,
            Err(UploadError::ParentNotFolder)
        ));
    }

    #[tokio::test]
    async fn test_upload_parent_as_text_and_root() {
        let fx = Fixture::new().await;
        let token = fx.sessions.issue(1).await.unwrap();
        let pipeline = fx.pipeline();

        let folder = pipeline
            .upload(Some(&token), &UploadRequest::new("Docs", FileType::Folder))
            .await
            .unwrap();

        let mut request = UploadRequest::new("Sub", FileType::Folder);
        request.parent_id = Some(ParentRef::Text(folder.id.to_string()));
        let sub = pipeline.upload(Some(&token), &request).await.unwrap();
        assert_eq!(sub.parent_id, folder.id);

        request.parent_id = Some(ParentRef::Text("0".to_string()));
        let top = pipeline.upload(Some(&token), &request).await.unwrap();
        assert_eq!(top.parent_id, ROOT_PARENT_ID);
    }

    #[test]
    fn test_upload_request_deserialize() {
        let request: UploadRequest = serde_json::from_str(
            r#"{"name":"a.txt","type":"file","parentId":"3","isPublic":true,"data":"aGk="}"#,
        )
        .unwrap();

        assert_eq!(request.name.as_deref(), Some("a.txt"));
        assert_eq!(request.file_type.as_deref(), Some("file"));
        assert_eq!(request.parent_id, Some(ParentRef::Text("3".to_string())));
        assert_eq!(request.is_public, Some(true));

        let request: UploadRequest =
            serde_json::from_str(r#"{"name":"Docs","type":"folder","parentId":7}"#).unwrap();
        assert_eq!(request.parent_id.and_then(|p| p.id()), Some(7));
    }

    #[test]
    fn test_upload_request_fields_read_independently() {
        let request: UploadRequest = serde_json::from_str(
            r#"{"name":"Docs","type":"folder","isPublic":"true","data":42}"#,
        )
        .unwrap();
        assert_eq!(request.name.as_deref(), Some("Docs"));
        assert_eq!(request.file_type.as_deref(), Some("folder"));
        assert_eq!(request.is_public, Some(true));
        assert!(request.data.is_none());

        let request: UploadRequest =
            serde_json::from_str(r#"{"name":7,"type":["file"],"isPublic":0,"parentId":null}"#)
                .unwrap();
        assert_eq!(request.name.as_deref(), Some("7"));
        assert!(request.file_type.is_none());
        assert_eq!(request.is_public, Some(false));
        assert!(request.parent_id.is_none());

        let request: UploadRequest =
            serde_json::from_str(r#"{"parentId":{"id":3},"isPublic":"no"}"#).unwrap();
        assert_eq!(request.parent_id.and_then(|p| p.id()), None);
        assert_eq!(request.is_public, Some(false));
    }
}
