//! Local byte storage.
//!
//! Uploaded bytes live flat under a single root directory:
//! ```text
//! {base_path}/
//! ├── 0f8fad5b-d9cb-469f-a165-70867728950e
//! ├── 0f8fad5b-d9cb-469f-a165-70867728950e_500
//! ├── 0f8fad5b-d9cb-469f-a165-70867728950e_250
//! └── 0f8fad5b-d9cb-469f-a165-70867728950e_100
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::Result;

/// File storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a storage handle. The directory is created on first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write `content` under a fresh UUID name and return its absolute path.
    pub async fn save(&self, content: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_path).await?;

        let path = std::path::absolute(self.base_path.join(Uuid::new_v4().to_string()))?;
        fs::write(&path, content).await?;

        Ok(path)
    }

    /// Read a stored file. Returns `None` when nothing exists at `path`.
    pub async fn read(path: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
        match fs::read(path.as_ref()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Path of the derivative of `original` at `width`: `<original>_<width>`.
    pub fn derivative_path(original: impl AsRef<Path>, width: u32) -> PathBuf {
        let mut path = original.as_ref().as_os_str().to_owned();
        path.push(format!("_{width}"));
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("files_manager"));

        let path = storage.save(b"hello").await.unwrap();

        assert!(path.is_absolute());
        assert!(path.starts_with(dir.path().join("files_manager")));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(name).is_ok());
        assert_eq!(FileStorage::read(&path).await.unwrap().unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_save_unique_names() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());

        let a = storage.save(b"same").await.unwrap();
        let b = storage.save(b"same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_read_missing() {
        let dir = TempDir::new().unwrap();
        let result = FileStorage::read(dir.path().join("nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_derivative_path() {
        let path = FileStorage::derivative_path("/tmp/files_manager/abc", 250);
        assert_eq!(path, PathBuf::from("/tmp/files_manager/abc_250"));
    }
}
