use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::enums::{
    AlertSeverity, ConditionSeverity, ConditionStatus, HealthStatus, Priority,
    RecommendationType, Urgency,
};

// ---------------------------------------------------------------------------
// Clinical findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionFinding {
    pub name: String,
    pub severity: ConditionSeverity,
    pub status: ConditionStatus,
    /// Lab test that triggered the finding, as written in the document.
    pub source_test: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertFinding {
    pub message: String,
    pub severity: AlertSeverity,
    pub action_required: bool,
    pub source_test: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationFinding {
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub timeframe: String,
    pub confidence: f32,
}

/// Anything the rule engine derives from lab values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClinicalFinding {
    Condition(ConditionFinding),
    Alert(AlertFinding),
    Recommendation(RecommendationFinding),
}

impl ClinicalFinding {
    pub fn confidence(&self) -> f32 {
        match self {
            Self::Condition(c) => c.confidence,
            Self::Alert(a) => a.confidence,
            Self::Recommendation(r) => r.confidence,
        }
    }
}

// ---------------------------------------------------------------------------
// Action candidates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationCandidate {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub purpose: String,
    pub side_effects: Vec<String>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentCandidate {
    pub specialty: String,
    pub reason: String,
    pub urgency: Urgency,
    pub suggested_date: NaiveDate,
    pub confidence: f32,
}

// ---------------------------------------------------------------------------
// Rule engine output
// ---------------------------------------------------------------------------

/// Everything the rule engine derived from one document's entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalInterpretation {
    pub findings: Vec<ClinicalFinding>,
    pub medications: Vec<MedicationCandidate>,
    pub appointments: Vec<AppointmentCandidate>,
}

impl ClinicalInterpretation {
    pub fn conditions(&self) -> impl Iterator<Item = &ConditionFinding> {
        self.findings.iter().filter_map(|f| match f {
            ClinicalFinding::Condition(c) => Some(c),
            _ => None,
        })
    }

    pub fn alerts(&self) -> impl Iterator<Item = &AlertFinding> {
        self.findings.iter().filter_map(|f| match f {
            ClinicalFinding::Alert(a) => Some(a),
            _ => None,
        })
    }

    pub fn recommendations(&self) -> impl Iterator<Item = &RecommendationFinding> {
        self.findings.iter().filter_map(|f| match f {
            ClinicalFinding::Recommendation(r) => Some(r),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty() && self.medications.is_empty() && self.appointments.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

/// Conditions and medications known for a member at prediction time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedHealthData {
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
}

impl AggregatedHealthData {
    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn has_medication(&self, name: &str) -> bool {
        self.medications.iter().any(|m| m.eq_ignore_ascii_case(name))
    }

    /// Add entries not already present (case-insensitive).
    pub fn merge(
        &mut self,
        conditions: impl IntoIterator<Item = String>,
        medications: impl IntoIterator<Item = String>,
    ) {
        for condition in conditions {
            if !self.has_condition(&condition) {
                self.conditions.push(condition);
            }
        }
        for medication in medications {
            if !self.has_medication(&medication) {
                self.medications.push(medication);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionCandidate {
    pub condition: String,
    pub probability: f32,
    pub timeframe: String,
    pub risk_factors: Vec<String>,
    pub prevention_tips: Vec<String>,
    pub confidence: f32,
}

// ---------------------------------------------------------------------------
// Health score
// ---------------------------------------------------------------------------

/// Itemized health score. Adjustments are signed: penalties are negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthScoreBreakdown {
    pub base: i32,
    pub age_adjustment: i32,
    pub condition_penalty: i32,
    pub medication_penalty: i32,
    pub checkup_bonus: i32,
    pub appointment_bonus: i32,
    pub final_score: u8,
    pub status: HealthStatus,
}

impl HealthScoreBreakdown {
    /// Sum of all components before clamping.
    pub fn raw_total(&self) -> i32 {
        self.base
            + self.age_adjustment
            + self.condition_penalty
            + self.medication_penalty
            + self.checkup_bonus
            + self.appointment_bonus
    }
}
