use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MedicationStatus;

/// A medication reminder persisted for a family member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: Uuid,
    pub member_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub purpose: Option<String>,
    pub side_effects: Vec<String>,
    pub status: MedicationStatus,
    pub created_at: NaiveDateTime,
}

/// Key under which a medication is deduplicated for one member.
pub fn medication_dedup_key(name: &str, dosage: &str) -> String {
    let name = name.trim().to_lowercase();
    let dosage: String = dosage
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!("{name}|{dosage}")
}
