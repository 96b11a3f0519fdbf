use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use uuid::Uuid;

use super::repository::{self, HealthStore, WriteOutcome};
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::config::ActionSettings;
use crate::intelligence::types::HealthScoreBreakdown;
use crate::models::{Appointment, FamilyMember, Medication};

/// [`HealthStore`] over a single SQLite connection. Calls are serialized
/// through the inner mutex.
pub struct SqliteHealthStore {
    conn: Mutex<Connection>,
    appointment_window_days: i64,
}

impl SqliteHealthStore {
    pub fn new(conn: Connection, settings: ActionSettings) -> Self {
        Self {
            conn: Mutex::new(conn),
            appointment_window_days: settings.appointment_dedup_window_days,
        }
    }

    pub fn open(path: &Path, settings: ActionSettings) -> Result<Self, DatabaseError> {
        Ok(Self::new(open_database(path)?, settings))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(open_memory_database()?, ActionSettings::default()))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl HealthStore for SqliteHealthStore {
    fn create_family_member(&self, member: &FamilyMember) -> Result<Uuid, DatabaseError> {
        repository::insert_family_member(&*self.conn()?, member)?;
        tracing::info!(member_id = %member.id, "Family member created");
        Ok(member.id)
    }

    fn read_family_member(&self, id: &Uuid) -> Result<FamilyMember, DatabaseError> {
        repository::get_family_member(&*self.conn()?, id)
    }

    fn update_family_member(&self, member: &FamilyMember) -> Result<(), DatabaseError> {
        repository::update_family_member(&*self.conn()?, member)
    }

    fn add_conditions(
        &self,
        member_id: &Uuid,
        conditions: &[String],
    ) -> Result<Vec<String>, DatabaseError> {
        let added = repository::add_conditions(&*self.conn()?, member_id, conditions)?;
        if !added.is_empty() {
            tracing::info!(member_id = %member_id, added = ?added, "Conditions recorded");
        }
        Ok(added)
    }

    fn delete_family_member(&self, id: &Uuid) -> Result<(), DatabaseError> {
        repository::delete_family_member(&*self.conn()?, id)?;
        tracing::info!(member_id = %id, "Family member deleted");
        Ok(())
    }

    fn list_family_members(&self) -> Result<Vec<FamilyMember>, DatabaseError> {
        repository::list_family_members(&*self.conn()?)
    }

    fn create_medication(&self, medication: &Medication) -> Result<WriteOutcome, DatabaseError> {
        repository::insert_medication_if_absent(&*self.conn()?, medication)
    }

    fn list_medications(&self, member_id: &Uuid) -> Result<Vec<Medication>, DatabaseError> {
        repository::get_medications_for_member(&*self.conn()?, member_id)
    }

    fn create_appointment(&self, appointment: &Appointment) -> Result<WriteOutcome, DatabaseError> {
        repository::insert_appointment_if_absent(
            &*self.conn()?,
            appointment,
            self.appointment_window_days,
        )
    }

    fn list_appointments(&self, member_id: &Uuid) -> Result<Vec<Appointment>, DatabaseError> {
        repository::get_appointments_for_member(&*self.conn()?, member_id)
    }

    fn update_health_score(
        &self,
        member_id: &Uuid,
        breakdown: &HealthScoreBreakdown,
    ) -> Result<(), DatabaseError> {
        repository::update_health_score(&*self.conn()?, member_id, breakdown)
    }
}
