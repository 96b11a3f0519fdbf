//! Repository layer: entity-scoped database operations as free functions on
//! a borrowed [`Connection`](rusqlite::Connection), plus the [`HealthStore`]
//! seam the pipeline talks to.

mod appointment;
mod medication;
mod member;

use uuid::Uuid;

use super::DatabaseError;
use crate::intelligence::types::HealthScoreBreakdown;
use crate::models::{Appointment, FamilyMember, Medication};

pub use appointment::*;
pub use medication::*;
pub use member::*;

/// Result of an idempotent create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created(Uuid),
    /// An equivalent record already exists; carries its id.
    AlreadyPresent(Uuid),
}

impl WriteOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Created(id) | Self::AlreadyPresent(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Persistence collaborator for family members and the records the pipeline
/// creates for them.
///
/// `create_medication` dedupes on (member, name + dosage); `create_appointment`
/// dedupes on (member, specialty, date within the store's window).
pub trait HealthStore: Send + Sync {
    fn create_family_member(&self, member: &FamilyMember) -> Result<Uuid, DatabaseError>;
    fn read_family_member(&self, id: &Uuid) -> Result<FamilyMember, DatabaseError>;
    /// Overwrites the profile fields. Callers that change scored fields
    /// refresh the score afterwards (see
    /// [`crate::intelligence::score::edit_family_member`]).
    fn update_family_member(&self, member: &FamilyMember) -> Result<(), DatabaseError>;
    /// Atomically append conditions not yet recorded; returns those added.
    fn add_conditions(
        &self,
        member_id: &Uuid,
        conditions: &[String],
    ) -> Result<Vec<String>, DatabaseError>;
    fn delete_family_member(&self, id: &Uuid) -> Result<(), DatabaseError>;
    fn list_family_members(&self) -> Result<Vec<FamilyMember>, DatabaseError>;

    fn create_medication(&self, medication: &Medication) -> Result<WriteOutcome, DatabaseError>;
    fn list_medications(&self, member_id: &Uuid) -> Result<Vec<Medication>, DatabaseError>;

    fn create_appointment(&self, appointment: &Appointment)
        -> Result<WriteOutcome, DatabaseError>;
    fn list_appointments(&self, member_id: &Uuid) -> Result<Vec<Appointment>, DatabaseError>;

    fn update_health_score(
        &self,
        member_id: &Uuid,
        breakdown: &HealthScoreBreakdown,
    ) -> Result<(), DatabaseError>;
}

pub(crate) fn parse_uuid(column: &'static str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::Corrupt {
        column,
        reason: e.to_string(),
    })
}

pub(crate) fn parse_date(
    column: &'static str,
    raw: Option<String>,
) -> Result<Option<chrono::NaiveDate>, DatabaseError> {
    raw.map(|d| {
        chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|e| DatabaseError::Corrupt {
            column,
            reason: format!("{d}: {e}"),
        })
    })
    .transpose()
}

pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn parse_datetime(
    column: &'static str,
    raw: &str,
) -> Result<chrono::NaiveDateTime, DatabaseError> {
    chrono::NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|e| DatabaseError::Corrupt {
        column,
        reason: format!("{raw}: {e}"),
    })
}

pub(crate) fn to_json<T: serde::Serialize>(
    column: &'static str,
    value: &T,
) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Corrupt {
        column,
        reason: e.to_string(),
    })
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    column: &'static str,
    raw: &str,
) -> Result<T, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::Corrupt {
        column,
        reason: e.to_string(),
    })
}
