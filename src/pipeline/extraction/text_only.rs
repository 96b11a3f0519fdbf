//! Text-only extraction: decodes plain-text uploads and scans them for
//! entities. Images and PDFs need an OCR backend and are refused.

use async_trait::async_trait;

use super::entity_scan::scan_entities;
use super::sanitize::sanitize_extracted_text;
use super::types::ExtractionResult;
use super::{DocumentExtractor, ExtractionError};
use crate::pipeline::import::{FileCategory, FormatDetection, RawDocument};

/// Confidence reported for a clean UTF-8 decode.
pub const PLAIN_TEXT_CONFIDENCE: f32 = 0.99;

pub struct PlainTextExtractor;

#[async_trait]
impl DocumentExtractor for PlainTextExtractor {
    async fn extract(
        &self,
        doc: &RawDocument,
        format: &FormatDetection,
    ) -> Result<ExtractionResult, ExtractionError> {
        tracing::debug!(
            file_name = %doc.file_name,
            category = format.category.as_str(),
            "PlainTextExtractor: starting text-only extraction"
        );

        if format.category != FileCategory::PlainText {
            return Err(ExtractionError::UnsupportedFormat(format!(
                "{} needs an OCR backend",
                format.mime_type
            )));
        }

        let decoded = std::str::from_utf8(&doc.bytes)
            .map_err(|e| ExtractionError::Encoding(e.to_string()))?;
        let text = sanitize_extracted_text(decoded);
        let entities = scan_entities(&text);

        ExtractionResult {
            text,
            confidence: PLAIN_TEXT_CONFIDENCE,
            entities,
        }
        .validated()
    }
}
