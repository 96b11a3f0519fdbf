pub mod format;

pub use format::*;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An uploaded file, held in memory for the duration of one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    pub file_name: String,
    pub declared_mime: Option<String>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: sanitize_filename(&file_name.into()),
            declared_mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    /// Read a file from disk; the name is taken from the path. Oversized
    /// files are refused from their metadata before any bytes are read.
    pub async fn from_path(path: &Path, max_file_size_bytes: u64) -> Result<Self, UploadError> {
        let name = path.to_string_lossy().into_owned();
        let unreadable = |e: std::io::Error| UploadError::Unreadable {
            file_name: name.clone(),
            detail: e.to_string(),
        };

        let size = tokio::fs::metadata(path).await.map_err(&unreadable)?.len();
        format::ensure_file_size(size, max_file_size_bytes)?;
        let bytes = tokio::fs::read(path).await.map_err(unreadable)?;
        Ok(Self::new(name, bytes))
    }
}

/// Rejections raised before any extraction work starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("Unsupported file type for {file_name}: {detail}")]
    UnsupportedFileType { file_name: String, detail: String },

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Too many files: {count} exceeds the batch limit of {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("Cannot read {file_name}: {detail}")]
    Unreadable { file_name: String, detail: String },
}
