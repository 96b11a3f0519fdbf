use chrono::{Duration, NaiveDate};

use super::medication::parse_medication_mentions;
use super::reference::specialty_for;
use super::rules::{normalize_test_name, parse_lab_value, LabRule, LAB_RULES};
use super::types::{
    AppointmentCandidate, ClinicalFinding, ClinicalInterpretation, ConditionFinding,
};
use crate::models::enums::{ConditionSeverity, Urgency};
use crate::pipeline::extraction::ExtractedEntities;

/// Confidence attached to every derived appointment.
pub const APPOINTMENT_CONFIDENCE: f32 = 0.85;

/// Turns extracted entities into findings and action candidates.
///
/// Deterministic and infallible: unknown tests, unparseable values and
/// unparseable medication mentions are skipped.
pub struct ClinicalRuleEngine {
    rules: &'static [LabRule],
}

impl Default for ClinicalRuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ClinicalRuleEngine {
    pub fn new() -> Self {
        Self { rules: LAB_RULES }
    }

    pub fn interpret(
        &self,
        entities: &ExtractedEntities,
        extraction_confidence: f32,
        today: NaiveDate,
    ) -> ClinicalInterpretation {
        let medications =
            parse_medication_mentions(&entities.medication_mentions, extraction_confidence);

        let mut findings = Vec::new();
        for (test_name, raw_value) in &entities.lab_values {
            let Some(value) = parse_lab_value(raw_value) else {
                tracing::debug!(test = %test_name, value = %raw_value, "Non-numeric lab value, skipping");
                continue;
            };
            let normalized = normalize_test_name(test_name);
            for rule in self.rules {
                findings.extend(rule.evaluate(test_name, &normalized, value));
            }
        }
        let findings = merge_findings(findings);

        let appointments = findings
            .iter()
            .filter_map(|f| match f {
                ClinicalFinding::Condition(c) => derive_appointment(c, today),
                _ => None,
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            findings = findings.len(),
            medications = medications.len(),
            appointments = appointments.len(),
            "Clinical interpretation complete"
        );

        ClinicalInterpretation {
            findings,
            medications,
            appointments,
        }
    }
}

/// Collapse repeats: conditions by name (highest severity wins), alerts by
/// message, recommendations by title. First-seen order is kept.
fn merge_findings(findings: Vec<ClinicalFinding>) -> Vec<ClinicalFinding> {
    let mut merged: Vec<ClinicalFinding> = Vec::with_capacity(findings.len());
    for finding in findings {
        match merged.iter().position(|m| same_finding(m, &finding)) {
            Some(idx) => {
                if let (ClinicalFinding::Condition(kept), ClinicalFinding::Condition(new)) =
                    (&mut merged[idx], finding)
                {
                    if new.severity.max(kept.severity) != kept.severity {
                        *kept = new;
                    }
                }
            }
            None => merged.push(finding),
        }
    }
    merged
}

fn same_finding(a: &ClinicalFinding, b: &ClinicalFinding) -> bool {
    match (a, b) {
        (ClinicalFinding::Condition(x), ClinicalFinding::Condition(y)) => {
            x.name.eq_ignore_ascii_case(&y.name)
        }
        (ClinicalFinding::Alert(x), ClinicalFinding::Alert(y)) => x.message == y.message,
        (ClinicalFinding::Recommendation(x), ClinicalFinding::Recommendation(y)) => {
            x.title == y.title
        }
        _ => false,
    }
}

/// Days until a follow-up for a condition of the given severity.
pub fn follow_up_offset_days(severity: ConditionSeverity) -> i64 {
    match severity {
        ConditionSeverity::Severe => 3,
        ConditionSeverity::Moderate => 14,
        ConditionSeverity::Mild => 30,
    }
}

/// Appointment candidate for a moderate or severe condition.
pub fn derive_appointment(
    condition: &ConditionFinding,
    today: NaiveDate,
) -> Option<AppointmentCandidate> {
    if !condition.severity.needs_follow_up() {
        return None;
    }
    let urgency = if condition.severity == ConditionSeverity::Severe {
        Urgency::High
    } else {
        Urgency::Medium
    };
    Some(AppointmentCandidate {
        specialty: specialty_for(&condition.name).to_string(),
        reason: format!("Follow-up for {}", condition.name),
        urgency,
        suggested_date: today + Duration::days(follow_up_offset_days(condition.severity)),
        confidence: APPOINTMENT_CONFIDENCE,
    })
}
