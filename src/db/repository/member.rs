use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{from_json, parse_date, parse_uuid, to_json};
use crate::db::DatabaseError;
use crate::intelligence::types::HealthScoreBreakdown;
use crate::models::enums::HealthStatus;
use crate::models::FamilyMember;

const MEMBER_COLUMNS: &str = "m.id, m.name, m.date_of_birth, m.age, m.conditions, m.last_checkup,
     m.next_appointment, m.health_score, m.health_status,
     (SELECT COUNT(*) FROM medications med WHERE med.member_id = m.id AND med.status = 'active')";

pub fn insert_family_member(conn: &Connection, member: &FamilyMember) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO family_members (id, name, date_of_birth, age, conditions, last_checkup,
         next_appointment, health_score, health_status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            member.id.to_string(),
            member.name,
            member.date_of_birth.map(|d| d.to_string()),
            member.age,
            to_json("family_members.conditions", &member.conditions)?,
            member.last_checkup.map(|d| d.to_string()),
            member.next_appointment.map(|d| d.to_string()),
            member.health_score,
            member.health_status.map(|s| s.as_str()),
        ],
    )?;
    Ok(())
}

pub fn get_family_member(conn: &Connection, id: &Uuid) -> Result<FamilyMember, DatabaseError> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM family_members m WHERE m.id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], member_row_from_rusqlite)
        .optional()?;

    match row {
        Some(row) => member_from_row(row),
        None => Err(DatabaseError::NotFound {
            entity_type: "FamilyMember".into(),
            id: id.to_string(),
        }),
    }
}

pub fn list_family_members(conn: &Connection) -> Result<Vec<FamilyMember>, DatabaseError> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM family_members m ORDER BY m.created_at, m.name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], member_row_from_rusqlite)?;

    let mut members = Vec::new();
    for row in rows {
        members.push(member_from_row(row?)?);
    }
    Ok(members)
}

/// Update the editable profile fields. Score fields and the medication count
/// are owned by the store and left untouched.
pub fn update_family_member(conn: &Connection, member: &FamilyMember) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE family_members SET name = ?2, date_of_birth = ?3, age = ?4, conditions = ?5,
         last_checkup = ?6, next_appointment = ?7
         WHERE id = ?1",
        params![
            member.id.to_string(),
            member.name,
            member.date_of_birth.map(|d| d.to_string()),
            member.age,
            to_json("family_members.conditions", &member.conditions)?,
            member.last_checkup.map(|d| d.to_string()),
            member.next_appointment.map(|d| d.to_string()),
        ],
    )?;
    ensure_found(updated, &member.id)
}

/// Append conditions the member does not already have (case-insensitive)
/// in one transaction; no other column is written. Returns the names added.
pub fn add_conditions(
    conn: &Connection,
    member_id: &Uuid,
    conditions: &[String],
) -> Result<Vec<String>, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let raw: Option<String> = tx
        .query_row(
            "SELECT conditions FROM family_members WHERE id = ?1",
            params![member_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(raw) = raw else {
        return Err(DatabaseError::NotFound {
            entity_type: "FamilyMember".into(),
            id: member_id.to_string(),
        });
    };
    let mut current: Vec<String> = from_json("family_members.conditions", &raw)?;

    let mut added = Vec::new();
    for condition in conditions {
        let condition = condition.trim();
        if condition.is_empty() || current.iter().any(|c| c.eq_ignore_ascii_case(condition)) {
            continue;
        }
        current.push(condition.to_string());
        added.push(condition.to_string());
    }

    if !added.is_empty() {
        tx.execute(
            "UPDATE family_members SET conditions = ?2 WHERE id = ?1",
            params![
                member_id.to_string(),
                to_json("family_members.conditions", &current)?,
            ],
        )?;
    }
    tx.commit()?;
    Ok(added)
}

/// Delete a member; medications and appointments cascade.
pub fn delete_family_member(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM family_members WHERE id = ?1",
        params![id.to_string()],
    )?;
    ensure_found(deleted, id)
}

pub fn update_health_score(
    conn: &Connection,
    member_id: &Uuid,
    breakdown: &HealthScoreBreakdown,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE family_members SET health_score = ?2, health_status = ?3, score_breakdown = ?4
         WHERE id = ?1",
        params![
            member_id.to_string(),
            breakdown.final_score,
            breakdown.status.as_str(),
            to_json("family_members.score_breakdown", breakdown)?,
        ],
    )?;
    ensure_found(updated, member_id)
}

/// The breakdown stored by the last [`update_health_score`], if any.
pub fn get_score_breakdown(
    conn: &Connection,
    member_id: &Uuid,
) -> Result<Option<HealthScoreBreakdown>, DatabaseError> {
    let raw: Option<Option<String>> = conn
        .query_row(
            "SELECT score_breakdown FROM family_members WHERE id = ?1",
            params![member_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        None => Err(DatabaseError::NotFound {
            entity_type: "FamilyMember".into(),
            id: member_id.to_string(),
        }),
        Some(None) => Ok(None),
        Some(Some(json)) => from_json("family_members.score_breakdown", &json).map(Some),
    }
}

fn ensure_found(affected: usize, id: &Uuid) -> Result<(), DatabaseError> {
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "FamilyMember".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

struct MemberRow {
    id: String,
    name: String,
    date_of_birth: Option<String>,
    age: Option<u32>,
    conditions: String,
    last_checkup: Option<String>,
    next_appointment: Option<String>,
    health_score: Option<u8>,
    health_status: Option<String>,
    medication_count: u32,
}

fn member_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<MemberRow, rusqlite::Error> {
    Ok(MemberRow {
        id: row.get(0)?,
        name: row.get(1)?,
        date_of_birth: row.get(2)?,
        age: row.get(3)?,
        conditions: row.get(4)?,
        last_checkup: row.get(5)?,
        next_appointment: row.get(6)?,
        health_score: row.get(7)?,
        health_status: row.get(8)?,
        medication_count: row.get(9)?,
    })
}

fn member_from_row(row: MemberRow) -> Result<FamilyMember, DatabaseError> {
    Ok(FamilyMember {
        id: parse_uuid("family_members.id", &row.id)?,
        name: row.name,
        date_of_birth: parse_date("family_members.date_of_birth", row.date_of_birth)?,
        age: row.age,
        conditions: from_json("family_members.conditions", &row.conditions)?,
        last_checkup: parse_date("family_members.last_checkup", row.last_checkup)?,
        next_appointment: parse_date("family_members.next_appointment", row.next_appointment)?,
        medication_count: row.medication_count,
        health_score: row.health_score,
        health_status: row
            .health_status
            .as_deref()
            .map(HealthStatus::from_str)
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn member(name: &str) -> FamilyMember {
        let mut m = FamilyMember::new(name);
        m.date_of_birth = NaiveDate::from_ymd_opt(1956, 4, 2);
        m.conditions = vec!["Hypertension".into()];
        m
    }

    #[test]
    fn insert_and_read_back() {
        let conn = open_memory_database().unwrap();
        let m = member("Grandma");
        insert_family_member(&conn, &m).unwrap();

        let loaded = get_family_member(&conn, &m.id).unwrap();
        assert_eq!(loaded, m);
        assert_eq!(loaded.medication_count, 0);
    }

    #[test]
    fn missing_member_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = get_family_member(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn update_changes_profile_fields() {
        let conn = open_memory_database().unwrap();
        let mut m = member("Grandma");
        insert_family_member(&conn, &m).unwrap();

        m.conditions.push("Diabetes".into());
        m.last_checkup = NaiveDate::from_ymd_opt(2026, 1, 10);
        update_family_member(&conn, &m).unwrap();

        let loaded = get_family_member(&conn, &m.id).unwrap();
        assert_eq!(loaded.conditions, vec!["Hypertension", "Diabetes"]);
        assert_eq!(loaded.last_checkup, m.last_checkup);
    }

    #[test]
    fn update_unknown_member_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = update_family_member(&conn, &member("Ghost")).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn add_conditions_merges_without_touching_other_columns() {
        let conn = open_memory_database().unwrap();
        let mut m = member("Grandma");
        m.next_appointment = NaiveDate::from_ymd_opt(2026, 3, 7);
        insert_family_member(&conn, &m).unwrap();

        let added = add_conditions(
            &conn,
            &m.id,
            &["hypertension".to_string(), "Diabetes".to_string(), "Diabetes".to_string()],
        )
        .unwrap();
        assert_eq!(added, vec!["Diabetes"]);

        let loaded = get_family_member(&conn, &m.id).unwrap();
        assert_eq!(loaded.conditions, vec!["Hypertension", "Diabetes"]);
        assert_eq!(loaded.next_appointment, m.next_appointment);

        assert!(add_conditions(&conn, &m.id, &["Diabetes".to_string()])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn add_conditions_unknown_member_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = add_conditions(&conn, &Uuid::new_v4(), &["Asthma".to_string()]).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn list_and_delete() {
        let conn = open_memory_database().unwrap();
        let a = member("A");
        let b = member("B");
        insert_family_member(&conn, &a).unwrap();
        insert_family_member(&conn, &b).unwrap();
        assert_eq!(list_family_members(&conn).unwrap().len(), 2);

        delete_family_member(&conn, &a.id).unwrap();
        let remaining = list_family_members(&conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);
        assert!(delete_family_member(&conn, &a.id).is_err());
    }

    #[test]
    fn health_score_is_stored_with_breakdown() {
        let conn = open_memory_database().unwrap();
        let m = member("Grandma");
        insert_family_member(&conn, &m).unwrap();
        assert_eq!(get_score_breakdown(&conn, &m.id).unwrap(), None);

        let breakdown = HealthScoreBreakdown {
            base: 100,
            age_adjustment: -20,
            condition_penalty: -8,
            medication_penalty: 0,
            checkup_bonus: -15,
            appointment_bonus: -5,
            final_score: 52,
            status: HealthStatus::Poor,
        };
        update_health_score(&conn, &m.id, &breakdown).unwrap();

        let loaded = get_family_member(&conn, &m.id).unwrap();
        assert_eq!(loaded.health_score, Some(52));
        assert_eq!(loaded.health_status, Some(HealthStatus::Poor));
        assert_eq!(get_score_breakdown(&conn, &m.id).unwrap(), Some(breakdown));
    }

    #[test]
    fn corrupt_conditions_column_is_reported() {
        let conn = open_memory_database().unwrap();
        let m = member("Grandma");
        insert_family_member(&conn, &m).unwrap();
        conn.execute(
            "UPDATE family_members SET conditions = 'not json' WHERE id = ?1",
            params![m.id.to_string()],
        )
        .unwrap();
        let err = get_family_member(&conn, &m.id).unwrap_err();
        assert!(matches!(err, DatabaseError::Corrupt { column: "family_members.conditions", .. }));
    }
}
