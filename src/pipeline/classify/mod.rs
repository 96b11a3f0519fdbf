//! Document classifier: decides whether uploaded text is a health document
//! before any interpretation runs.
//!
//! Academic records (mark sheets, grade cards, semester results) are
//! rejected outright. Everything else is scored by weighted coverage of a
//! categorized medical lexicon.

pub mod lexicon;

use serde::{Deserialize, Serialize};

use crate::models::enums::RejectionReason;
use lexicon::{COMPILED_LEXICON, EXPLICIT_REJECTS};

/// Minimum score for a document to be accepted.
pub const ACCEPTANCE_THRESHOLD: f32 = 0.6;

/// At most this many labels are reported in `matched_terms`.
pub const MAX_MATCHED_TERMS: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationScore {
    pub score: f32,
    pub matched_terms: Vec<String>,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<RejectionReason>,
}

impl ClassificationScore {
    fn rejected(reason: RejectionReason) -> Self {
        Self {
            score: 0.0,
            matched_terms: Vec::new(),
            accepted: false,
            rejection_reason: Some(reason),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentClassifier;

impl DocumentClassifier {
    /// Score document text.
    pub fn classify(&self, text: &str) -> ClassificationScore {
        if text.trim().is_empty() {
            return ClassificationScore::rejected(RejectionReason::InsufficientTerms);
        }
        if is_explicitly_nonmedical(text) {
            tracing::debug!("Explicit non-medical pattern in text");
            return ClassificationScore::rejected(RejectionReason::ExplicitNonmedical);
        }

        // (first occurrence, label, weight) per distinct term
        let mut hits: Vec<(usize, &'static str, f32)> = COMPILED_LEXICON
            .iter()
            .filter_map(|c| {
                c.regex
                    .find(text)
                    .map(|m| (m.start(), c.term.label, c.term.category.weight()))
            })
            .collect();
        hits.sort_by_key(|(pos, _, _)| *pos);

        let score = hits.iter().map(|(_, _, w)| w).sum::<f32>().clamp(0.0, 1.0);
        let accepted = score >= ACCEPTANCE_THRESHOLD;
        let matched_terms = hits
            .iter()
            .take(MAX_MATCHED_TERMS)
            .map(|(_, label, _)| label.to_string())
            .collect();

        ClassificationScore {
            score,
            matched_terms,
            accepted,
            rejection_reason: (!accepted).then_some(RejectionReason::InsufficientTerms),
        }
    }

    /// Rejection from the file name alone, if it names an academic record.
    pub fn check_file_name(&self, file_name: &str) -> Option<ClassificationScore> {
        let spaced: String = file_name
            .chars()
            .map(|c| if matches!(c, '_' | '-' | '.') { ' ' } else { c })
            .collect();
        is_explicitly_nonmedical(&spaced)
            .then(|| ClassificationScore::rejected(RejectionReason::ExplicitNonmedical))
    }

    /// File name check first, then the text.
    pub fn classify_document(&self, file_name: &str, text: &str) -> ClassificationScore {
        self.check_file_name(file_name)
            .unwrap_or_else(|| self.classify(text))
    }
}

pub fn is_explicitly_nonmedical(text: &str) -> bool {
    EXPLICIT_REJECTS.iter().any(|re| re.is_match(text))
}
