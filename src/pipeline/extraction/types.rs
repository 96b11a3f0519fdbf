use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entity_scan::parse_document_date;
use super::ExtractionError;

/// Result of text extraction from a single document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub text: String,
    /// Backend confidence in the extracted text, 0–1.
    pub confidence: f32,
    pub entities: ExtractedEntities,
}

/// Entities a backend pulled out of the text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEntities {
    /// Free-text lines such as "Metformin 500mg twice daily".
    pub medication_mentions: Vec<String>,
    /// Test name → raw value string ("130 mg/dL").
    pub lab_values: BTreeMap<String, String>,
    /// Dates as written; backends may pass formats only they understand.
    pub dates: Vec<String>,
    pub providers: Vec<String>,
    pub facilities: Vec<String>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.medication_mentions.is_empty()
            && self.lab_values.is_empty()
            && self.dates.is_empty()
            && self.providers.is_empty()
            && self.facilities.is_empty()
    }

    /// Dates that parse, deduplicated and sorted. Unparseable ones are
    /// dropped.
    pub fn parsed_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .dates
            .iter()
            .filter_map(|d| parse_document_date(d))
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }
}

impl ExtractionResult {
    /// Check what a backend returned before anything downstream trusts it.
    /// A non-finite confidence is rejected; anything else is clamped to 0–1.
    pub fn validated(mut self) -> Result<Self, ExtractionError> {
        if !self.confidence.is_finite() {
            return Err(ExtractionError::Malformed(format!(
                "confidence is not a finite number: {}",
                self.confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            tracing::debug!(confidence = self.confidence, "Clamping out-of-range extraction confidence");
            self.confidence = self.confidence.clamp(0.0, 1.0);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(confidence: f32) -> ExtractionResult {
        ExtractionResult {
            text: "Glucose 130".into(),
            confidence,
            entities: ExtractedEntities::default(),
        }
    }

    #[test]
    fn in_range_confidence_is_kept() {
        assert_eq!(result(0.82).validated().unwrap().confidence, 0.82);
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        assert_eq!(result(1.7).validated().unwrap().confidence, 1.0);
        assert_eq!(result(-0.3).validated().unwrap().confidence, 0.0);
    }

    #[test]
    fn non_finite_confidence_is_malformed() {
        assert!(matches!(result(f32::NAN).validated(), Err(ExtractionError::Malformed(_))));
        assert!(matches!(
            result(f32::INFINITY).validated(),
            Err(ExtractionError::Malformed(_))
        ));
    }

    #[test]
    fn unparseable_backend_date_does_not_break_deserialization() {
        let json = r#"{
            "medicationMentions": [],
            "labValues": {},
            "dates": ["2026-02-14", "sometime last spring", "03/01/2026", "2026-02-14"],
            "providers": [],
            "facilities": []
        }"#;
        let entities: ExtractedEntities = serde_json::from_str(json).unwrap();
        assert_eq!(entities.dates.len(), 4);
        assert_eq!(
            entities.parsed_dates(),
            vec![
                NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
            ]
        );
    }

    #[test]
    fn entities_serialize_camel_case() {
        let mut entities = ExtractedEntities::default();
        assert!(entities.is_empty());
        entities.lab_values.insert("Glucose".into(), "130 mg/dL".into());
        let json = serde_json::to_value(&entities).unwrap();
        assert_eq!(json["labValues"]["Glucose"], "130 mg/dL");
        assert!(json["medicationMentions"].as_array().unwrap().is_empty());
    }
}
