//! Auto-action orchestrator: turns confident medication and appointment
//! candidates into persisted records.
//!
//! Gates are strict: a medication needs confidence above
//! [`MEDICATION_MIN_CONFIDENCE`], an appointment needs confidence above
//! [`APPOINTMENT_MIN_CONFIDENCE`] and an urgency other than low. Every
//! candidate gets exactly one [`ActionOutcome`]; a failed write never stops
//! the remaining candidates.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{DatabaseError, HealthStore, WriteOutcome};
use crate::intelligence::types::{
    AppointmentCandidate, ClinicalInterpretation, MedicationCandidate,
};
use crate::models::enums::{AppointmentStatus, MedicationStatus, Urgency};
use crate::models::{Appointment, Medication};

pub const MEDICATION_MIN_CONFIDENCE: f32 = 0.7;
pub const APPOINTMENT_MIN_CONFIDENCE: f32 = 0.8;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Failed to create {kind} '{subject}': {source}")]
    CreationFailed {
        kind: ActionKind,
        subject: String,
        #[source]
        source: DatabaseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Medication,
    Appointment,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Medication => "medication",
            Self::Appointment => "appointment",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// A new record was written.
    Created,
    /// An equivalent record already existed; nothing written.
    Duplicate,
    /// Below the confidence / urgency gate.
    Skipped,
    Failed,
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub kind: ActionKind,
    /// Medication name or appointment specialty.
    pub subject: String,
    pub created: bool,
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
}

impl ActionOutcome {
    fn written(kind: ActionKind, subject: &str, outcome: WriteOutcome) -> Self {
        let (status, reason) = match outcome {
            WriteOutcome::Created(_) => (ActionStatus::Created, None),
            WriteOutcome::AlreadyPresent(_) => {
                (ActionStatus::Duplicate, Some("Equivalent record already exists".into()))
            }
        };
        Self {
            kind,
            subject: subject.to_string(),
            created: outcome.is_created(),
            status,
            reason,
            record_id: Some(outcome.id()),
        }
    }

    fn skipped(kind: ActionKind, subject: &str, reason: String) -> Self {
        Self {
            kind,
            subject: subject.to_string(),
            created: false,
            status: ActionStatus::Skipped,
            reason: Some(reason),
            record_id: None,
        }
    }

    fn failed(error: ActionError) -> Self {
        let ActionError::CreationFailed { kind, ref subject, .. } = error;
        Self {
            kind,
            subject: subject.clone(),
            created: false,
            status: ActionStatus::Failed,
            reason: Some(error.to_string()),
            record_id: None,
        }
    }
}

pub fn medication_passes_gate(candidate: &MedicationCandidate) -> bool {
    candidate.confidence > MEDICATION_MIN_CONFIDENCE
}

pub fn appointment_passes_gate(candidate: &AppointmentCandidate) -> bool {
    candidate.confidence > APPOINTMENT_MIN_CONFIDENCE && candidate.urgency != Urgency::Low
}

pub struct AutoActionOrchestrator {
    store: Arc<dyn HealthStore>,
}

impl AutoActionOrchestrator {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self { store }
    }

    /// Gate and persist every candidate in `interpretation` for `member_id`.
    /// Returns one outcome per candidate, medications first, in input order.
    pub fn materialize(
        &self,
        member_id: &Uuid,
        interpretation: &ClinicalInterpretation,
        now: NaiveDateTime,
    ) -> Vec<ActionOutcome> {
        let ClinicalInterpretation {
            medications,
            appointments,
            ..
        } = interpretation;
        let mut outcomes = Vec::with_capacity(medications.len() + appointments.len());

        for candidate in medications {
            if !medication_passes_gate(candidate) {
                tracing::debug!(
                    member_id = %member_id,
                    medication = %candidate.name,
                    confidence = candidate.confidence,
                    "Medication below confidence gate"
                );
                outcomes.push(ActionOutcome::skipped(
                    ActionKind::Medication,
                    &candidate.name,
                    format!(
                        "Confidence {:.2} not above {MEDICATION_MIN_CONFIDENCE}",
                        candidate.confidence
                    ),
                ));
                continue;
            }
            outcomes.push(match self.create_medication(member_id, candidate, now) {
                Ok(written) => ActionOutcome::written(ActionKind::Medication, &candidate.name, written),
                Err(e) => {
                    tracing::warn!(member_id = %member_id, error = %e, "Medication creation failed");
                    ActionOutcome::failed(e)
                }
            });
        }

        for candidate in appointments {
            if !appointment_passes_gate(candidate) {
                let reason = if candidate.urgency == Urgency::Low {
                    "Low urgency".to_string()
                } else {
                    format!(
                        "Confidence {:.2} not above {APPOINTMENT_MIN_CONFIDENCE}",
                        candidate.confidence
                    )
                };
                tracing::debug!(
                    member_id = %member_id,
                    specialty = %candidate.specialty,
                    reason = %reason,
                    "Appointment below gate"
                );
                outcomes.push(ActionOutcome::skipped(
                    ActionKind::Appointment,
                    &candidate.specialty,
                    reason,
                ));
                continue;
            }
            outcomes.push(match self.create_appointment(member_id, candidate, now) {
                Ok(written) => {
                    ActionOutcome::written(ActionKind::Appointment, &candidate.specialty, written)
                }
                Err(e) => {
                    tracing::warn!(member_id = %member_id, error = %e, "Appointment creation failed");
                    ActionOutcome::failed(e)
                }
            });
        }

        let created = outcomes.iter().filter(|o| o.created).count();
        if created > 0 {
            tracing::info!(member_id = %member_id, created, "Auto-actions persisted");
        }
        outcomes
    }

    fn create_medication(
        &self,
        member_id: &Uuid,
        candidate: &MedicationCandidate,
        now: NaiveDateTime,
    ) -> Result<WriteOutcome, ActionError> {
        let medication = Medication {
            id: Uuid::new_v4(),
            member_id: *member_id,
            name: candidate.name.clone(),
            dosage: candidate.dosage.clone(),
            frequency: candidate.frequency.clone(),
            purpose: Some(candidate.purpose.clone()),
            side_effects: candidate.side_effects.clone(),
            status: MedicationStatus::Active,
            created_at: now,
        };
        self.store
            .create_medication(&medication)
            .map_err(|source| ActionError::CreationFailed {
                kind: ActionKind::Medication,
                subject: candidate.name.clone(),
                source,
            })
    }

    fn create_appointment(
        &self,
        member_id: &Uuid,
        candidate: &AppointmentCandidate,
        now: NaiveDateTime,
    ) -> Result<WriteOutcome, ActionError> {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            member_id: *member_id,
            specialty: candidate.specialty.clone(),
            reason: candidate.reason.clone(),
            urgency: candidate.urgency,
            date: candidate.suggested_date,
            status: AppointmentStatus::Scheduled,
            created_at: now,
        };
        self.store
            .create_appointment(&appointment)
            .map_err(|source| ActionError::CreationFailed {
                kind: ActionKind::Appointment,
                subject: candidate.specialty.clone(),
                source,
            })
    }
}
