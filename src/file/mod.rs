//! File management.
//!
//! This module owns the folder/file/image tree:
//! - Metadata records and the [`FileRepository`]
//! - Local byte storage under a single root directory
//! - The [`UploadPipeline`] that validates and persists uploads
//! - The [`FileService`] that enforces ownership and visibility on reads

mod metadata;
mod service;
mod storage;
mod upload;

pub use metadata::{FileRecord, FileRepository, NewFile};
pub use service::{FileContent, FileService, RetrievalError};
pub use storage::FileStorage;
pub use upload::{ParentRef, UploadError, UploadPipeline, UploadRequest};

use std::fmt;
use std::str::FromStr;

/// Parent id marking an entry at the root of a user's tree.
pub const ROOT_PARENT_ID: i64 = 0;

/// Entries per listing page.
pub const PAGE_SIZE: i64 = 20;

/// Derivative widths produced for images, largest first.
pub const THUMBNAIL_WIDTHS: [u32; 3] = [500, 250, 100];

/// Kind of entry in the file tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Container for other entries; has no content.
    Folder,
    /// Opaque bytes.
    File,
    /// Bytes that also get resized derivatives.
    Image,
}

impl FileType {
    /// Database and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Folder => "folder",
            FileType::File => "file",
            FileType::Image => "image",
        }
    }

    /// True for types that carry bytes on disk.
    pub fn has_content(&self) -> bool {
        !matches!(self, FileType::Folder)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "folder" => Ok(FileType::Folder),
            "file" => Ok(FileType::File),
            "image" => Ok(FileType::Image),
            _ => Err(format!("unknown file type: {s}")),
        }
    }
}

impl TryFrom<String> for FileType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
