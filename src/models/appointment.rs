use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentStatus, Urgency};

/// An appointment persisted for a family member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub member_id: Uuid,
    pub specialty: String,
    pub reason: String,
    pub urgency: Urgency,
    pub date: NaiveDate,
    pub status: AppointmentStatus,
    pub created_at: NaiveDateTime,
}
