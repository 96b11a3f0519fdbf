use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_date, parse_datetime, parse_uuid, WriteOutcome, DATETIME_FORMAT};
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, Urgency};
use crate::models::Appointment;

/// A live (non-cancelled) appointment for the same specialty within
/// `window_days` of `date`.
pub fn find_appointment_near(
    conn: &Connection,
    member_id: &Uuid,
    specialty: &str,
    date: NaiveDate,
    window_days: i64,
) -> Result<Option<Uuid>, DatabaseError> {
    let from = date - Duration::days(window_days);
    let to = date + Duration::days(window_days);
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM appointments
             WHERE member_id = ?1 AND LOWER(specialty) = LOWER(?2)
               AND date BETWEEN ?3 AND ?4 AND status != 'cancelled'
             ORDER BY date LIMIT 1",
            params![member_id.to_string(), specialty, from.to_string(), to.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    id.map(|s| parse_uuid("appointments.id", &s)).transpose()
}

/// Insert unless an equivalent appointment exists, then pull the member's
/// `next_appointment` forward if this one is sooner.
pub fn insert_appointment_if_absent(
    conn: &Connection,
    appt: &Appointment,
    window_days: i64,
) -> Result<WriteOutcome, DatabaseError> {
    if let Some(existing) =
        find_appointment_near(conn, &appt.member_id, &appt.specialty, appt.date, window_days)?
    {
        return Ok(WriteOutcome::AlreadyPresent(existing));
    }

    conn.execute(
        "INSERT INTO appointments (id, member_id, specialty, reason, urgency, date, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appt.id.to_string(),
            appt.member_id.to_string(),
            appt.specialty,
            appt.reason,
            appt.urgency.as_str(),
            appt.date.to_string(),
            appt.status.as_str(),
            appt.created_at.format(DATETIME_FORMAT).to_string(),
        ],
    )?;

    if appt.status == AppointmentStatus::Scheduled {
        // A stale past date is replaced as well as a later one.
        conn.execute(
            "UPDATE family_members SET next_appointment = ?2
             WHERE id = ?1
               AND (next_appointment IS NULL OR next_appointment > ?2 OR next_appointment < ?3)",
            params![
                appt.member_id.to_string(),
                appt.date.to_string(),
                appt.created_at.date().to_string(),
            ],
        )?;
    }

    Ok(WriteOutcome::Created(appt.id))
}

pub fn get_appointments_for_member(
    conn: &Connection,
    member_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, member_id, specialty, reason, urgency, date, status, created_at
         FROM appointments WHERE member_id = ?1 ORDER BY date",
    )?;

    let rows = stmt.query_map(params![member_id.to_string()], appointment_row_from_rusqlite)?;

    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row?)?);
    }
    Ok(appts)
}

struct AppointmentRow {
    id: String,
    member_id: String,
    specialty: String,
    reason: String,
    urgency: String,
    date: String,
    status: String,
    created_at: String,
}

fn appointment_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        member_id: row.get(1)?,
        specialty: row.get(2)?,
        reason: row.get(3)?,
        urgency: row.get(4)?,
        date: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    let date = parse_date("appointments.date", Some(row.date))?.ok_or(DatabaseError::Corrupt {
        column: "appointments.date",
        reason: "missing".into(),
    })?;
    Ok(Appointment {
        id: parse_uuid("appointments.id", &row.id)?,
        member_id: parse_uuid("appointments.member_id", &row.member_id)?,
        specialty: row.specialty,
        reason: row.reason,
        urgency: Urgency::from_str(&row.urgency)?,
        date,
        status: AppointmentStatus::from_str(&row.status)?,
        created_at: parse_datetime("appointments.created_at", &row.created_at)?,
    })
}
