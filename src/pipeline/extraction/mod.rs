//! Extraction adapter: turns an uploaded file into text plus lightweight
//! entities. Backends implement [`DocumentExtractor`]; the bundled
//! [`PlainTextExtractor`] handles `text/plain` uploads.

pub mod entity_scan;
pub mod sanitize;
pub mod text_only;
pub mod types;

pub use entity_scan::scan_entities;
pub use sanitize::sanitize_extracted_text;
pub use text_only::PlainTextExtractor;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::pipeline::import::{FormatDetection, RawDocument};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Extraction timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("Malformed extraction result: {0}")]
    Malformed(String),

    #[error("Unsupported format for extraction: {0}")]
    UnsupportedFormat(String),

    #[error("Text encoding error: {0}")]
    Encoding(String),

    #[error("Extraction backend failed: {0}")]
    Backend(String),
}

/// An OCR / NLP backend.
///
/// Implementations must be cancel-safe: the caller may drop the returned
/// future at any await point on timeout or cancellation.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(
        &self,
        doc: &RawDocument,
        format: &FormatDetection,
    ) -> Result<ExtractionResult, ExtractionError>;
}
