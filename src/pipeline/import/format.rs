use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{RawDocument, UploadError};
use crate::config::ExtractionSettings;

/// Broad file categories we handle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileCategory {
    Pdf,
    Image,
    PlainText,
    Unsupported,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::PlainText => "plain_text",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Self::Pdf,
            "text/plain" => Self::PlainText,
            m if m.starts_with("image/") => Self::Image,
            _ => Self::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// An upload that passed the gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatDetection {
    pub mime_type: String,
    pub category: FileCategory,
    pub extension: String,
    pub file_size_bytes: u64,
}

pub(crate) fn ensure_file_size(file_size: u64, max_bytes: u64) -> Result<(), UploadError> {
    if file_size > max_bytes {
        return Err(UploadError::FileTooLarge {
            size_mb: file_size as f64 / (1024.0 * 1024.0),
            max_mb: max_bytes / (1024 * 1024),
        });
    }
    Ok(())
}

/// Validate an upload against the allow-list and size limit.
///
/// The mime type is the declared one when present, else sniffed from magic
/// bytes, else guessed from the extension.
pub fn check_upload(
    doc: &RawDocument,
    settings: &ExtractionSettings,
) -> Result<FormatDetection, UploadError> {
    let file_size = doc.bytes.len() as u64;
    ensure_file_size(file_size, settings.max_file_size_bytes)?;

    let extension = Path::new(&doc.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !settings.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&extension)) {
        return Err(UploadError::UnsupportedFileType {
            file_name: doc.file_name.clone(),
            detail: if extension.is_empty() {
                "missing extension".into()
            } else {
                format!(".{extension} is not accepted")
            },
        });
    }

    let mime_type = doc
        .declared_mime
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty() && *m != "application/octet-stream")
        .map(str::to_string)
        .or_else(|| sniff_mime(&doc.bytes).map(str::to_string))
        .unwrap_or_else(|| {
            mime_guess::from_path(&doc.file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });

    let category = FileCategory::from_mime(&mime_type);
    if !category.is_supported() {
        return Err(UploadError::UnsupportedFileType {
            file_name: doc.file_name.clone(),
            detail: format!("content type {mime_type} is not accepted"),
        });
    }

    Ok(FormatDetection {
        mime_type,
        category,
        extension,
        file_size_bytes: file_size,
    })
}

/// Detect format from magic bytes. `None` when nothing recognizable.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x25, 0x50, 0x44, 0x46, ..] => Some("application/pdf"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some("image/tiff"),
        // HEIC/HEIF: "ftyp" at offset 4
        _ if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" => Some("image/heic"),
        _ if is_likely_text(bytes) => Some("text/plain"),
        _ => None,
    }
}

/// Valid UTF-8 in the first 4KB and mostly printable.
fn is_likely_text(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(4096)];
    if head.is_empty() {
        return false;
    }

    let text = match std::str::from_utf8(head) {
        Ok(t) => t,
        // A multi-byte char cut at the 4KB boundary is still text.
        Err(e) if e.error_len().is_none() && e.valid_up_to() > 0 => {
            match std::str::from_utf8(&head[..e.valid_up_to()]) {
                Ok(t) => t,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };

    // At least 80% printable characters (or whitespace)
    let total = text.chars().count().max(1);
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    printable as f64 / total as f64 > 0.80
}

/// Sanitize a filename: strip path components, limit length
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}
