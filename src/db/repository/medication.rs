use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{from_json, parse_datetime, parse_uuid, to_json, WriteOutcome, DATETIME_FORMAT};
use crate::db::DatabaseError;
use crate::models::enums::MedicationStatus;
use crate::models::{medication_dedup_key, Medication};

/// Id of the member's medication with the same name + dosage, if any.
pub fn find_medication_by_key(
    conn: &Connection,
    member_id: &Uuid,
    dedup_key: &str,
) -> Result<Option<Uuid>, DatabaseError> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM medications WHERE member_id = ?1 AND dedup_key = ?2",
            params![member_id.to_string(), dedup_key],
            |row| row.get(0),
        )
        .optional()?;
    id.map(|s| parse_uuid("medications.id", &s)).transpose()
}

/// Insert unless the member already has this name + dosage.
pub fn insert_medication_if_absent(
    conn: &Connection,
    med: &Medication,
) -> Result<WriteOutcome, DatabaseError> {
    let key = medication_dedup_key(&med.name, &med.dosage);
    if let Some(existing) = find_medication_by_key(conn, &med.member_id, &key)? {
        return Ok(WriteOutcome::AlreadyPresent(existing));
    }

    conn.execute(
        "INSERT INTO medications (id, member_id, name, dosage, frequency, purpose, side_effects,
         status, dedup_key, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            med.id.to_string(),
            med.member_id.to_string(),
            med.name,
            med.dosage,
            med.frequency,
            med.purpose,
            to_json("medications.side_effects", &med.side_effects)?,
            med.status.as_str(),
            key,
            med.created_at.format(DATETIME_FORMAT).to_string(),
        ],
    )?;
    Ok(WriteOutcome::Created(med.id))
}

pub fn get_medications_for_member(
    conn: &Connection,
    member_id: &Uuid,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, member_id, name, dosage, frequency, purpose, side_effects, status, created_at
         FROM medications WHERE member_id = ?1 ORDER BY created_at, name",
    )?;

    let rows = stmt.query_map(params![member_id.to_string()], medication_row_from_rusqlite)?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row?)?);
    }
    Ok(meds)
}

pub fn update_medication_status(
    conn: &Connection,
    med_id: &Uuid,
    status: MedicationStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE medications SET status = ?2 WHERE id = ?1",
        params![med_id.to_string(), status.as_str()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Medication".into(),
            id: med_id.to_string(),
        });
    }
    Ok(())
}

struct MedicationRow {
    id: String,
    member_id: String,
    name: String,
    dosage: String,
    frequency: String,
    purpose: Option<String>,
    side_effects: String,
    status: String,
    created_at: String,
}

fn medication_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<MedicationRow, rusqlite::Error> {
    Ok(MedicationRow {
        id: row.get(0)?,
        member_id: row.get(1)?,
        name: row.get(2)?,
        dosage: row.get(3)?,
        frequency: row.get(4)?,
        purpose: row.get(5)?,
        side_effects: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn medication_from_row(row: MedicationRow) -> Result<Medication, DatabaseError> {
    Ok(Medication {
        id: parse_uuid("medications.id", &row.id)?,
        member_id: parse_uuid("medications.member_id", &row.member_id)?,
        name: row.name,
        dosage: row.dosage,
        frequency: row.frequency,
        purpose: row.purpose,
        side_effects: from_json("medications.side_effects", &row.side_effects)?,
        status: MedicationStatus::from_str(&row.status)?,
        created_at: parse_datetime("medications.created_at", &row.created_at)?,
    })
}
