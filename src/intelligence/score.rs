//! Health score: a 0–100 summary of a member's age, conditions, medications
//! and checkup / appointment recency. Always recomputed from scratch.

use chrono::NaiveDate;
use uuid::Uuid;

use super::types::HealthScoreBreakdown;
use crate::config::ScoreWeights;
use crate::db::{DatabaseError, HealthStore};
use crate::models::enums::HealthStatus;
use crate::models::FamilyMember;

pub const BASE_SCORE: i32 = 100;

/// Upcoming appointments within this many days earn the bonus.
pub const APPOINTMENT_WINDOW_DAYS: i64 = 30;

/// Everything the score depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreInputs {
    pub age: Option<u32>,
    pub condition_count: u32,
    pub medication_count: u32,
    pub last_checkup: Option<NaiveDate>,
    pub next_appointment: Option<NaiveDate>,
}

impl ScoreInputs {
    pub fn from_member(member: &FamilyMember, today: NaiveDate) -> Self {
        Self {
            age: member.age_on(today),
            condition_count: member.conditions.len() as u32,
            medication_count: member.medication_count,
            last_checkup: member.last_checkup,
            next_appointment: member.next_appointment,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthScoreCalculator {
    weights: ScoreWeights,
}

impl HealthScoreCalculator {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, member: &FamilyMember, today: NaiveDate) -> HealthScoreBreakdown {
        self.score_inputs(&ScoreInputs::from_member(member, today), today)
    }

    pub fn score_inputs(&self, inputs: &ScoreInputs, today: NaiveDate) -> HealthScoreBreakdown {
        let age_adjustment = inputs.age.map_or(0, age_adjustment);
        let condition_penalty = -(self.weights.per_condition * inputs.condition_count as i32);
        let medication_penalty = -(self.weights.per_medication * inputs.medication_count as i32);
        let checkup_bonus = checkup_adjustment(inputs.last_checkup, today);
        let appointment_bonus = appointment_adjustment(inputs.next_appointment, today);

        let raw = BASE_SCORE
            + age_adjustment
            + condition_penalty
            + medication_penalty
            + checkup_bonus
            + appointment_bonus;
        let final_score = raw.clamp(0, 100) as u8;

        HealthScoreBreakdown {
            base: BASE_SCORE,
            age_adjustment,
            condition_penalty,
            medication_penalty,
            checkup_bonus,
            appointment_bonus,
            final_score,
            status: HealthStatus::from_score(final_score),
        }
    }
}

/// ≥65 −20, ≥50 −15, ≥35 −10, ≥18 −5, under 18 +5.
pub fn age_adjustment(age: u32) -> i32 {
    if age >= 65 {
        -20
    } else if age >= 50 {
        -15
    } else if age >= 35 {
        -10
    } else if age >= 18 {
        -5
    } else {
        5
    }
}

/// >365 days −15, >180 −10, >90 −5, otherwise +5; never checked up −15.
pub fn checkup_adjustment(last_checkup: Option<NaiveDate>, today: NaiveDate) -> i32 {
    let Some(last) = last_checkup else {
        return -15;
    };
    let days = (today - last).num_days();
    if days > 365 {
        -15
    } else if days > 180 {
        -10
    } else if days > 90 {
        -5
    } else {
        5
    }
}

/// +5 when the next appointment is within the next 30 days, −5 when none is
/// scheduled (past dates count as none), 0 when it is further out.
pub fn appointment_adjustment(next_appointment: Option<NaiveDate>, today: NaiveDate) -> i32 {
    match next_appointment {
        Some(date) if date >= today => {
            if (date - today).num_days() <= APPOINTMENT_WINDOW_DAYS {
                5
            } else {
                0
            }
        }
        _ => -5,
    }
}

/// Read the member, recompute the score and store it.
pub fn refresh_health_score(
    store: &dyn HealthStore,
    calculator: &HealthScoreCalculator,
    member_id: &Uuid,
    today: NaiveDate,
) -> Result<HealthScoreBreakdown, DatabaseError> {
    let member = store.read_family_member(member_id)?;
    let breakdown = calculator.score(&member, today);
    store.update_health_score(member_id, &breakdown)?;

    tracing::info!(
        member_id = %member_id,
        score = breakdown.final_score,
        status = breakdown.status.as_str(),
        "Health score refreshed"
    );
    Ok(breakdown)
}

/// Create a member and give it its first score. Returns the stored record.
pub fn register_family_member(
    store: &dyn HealthStore,
    calculator: &HealthScoreCalculator,
    member: &FamilyMember,
    today: NaiveDate,
) -> Result<FamilyMember, DatabaseError> {
    let id = store.create_family_member(member)?;
    refresh_health_score(store, calculator, &id, today)?;
    store.read_family_member(&id)
}

/// Save profile edits and rescore; age, conditions and the checkup and
/// appointment dates all feed the score.
pub fn edit_family_member(
    store: &dyn HealthStore,
    calculator: &HealthScoreCalculator,
    member: &FamilyMember,
    today: NaiveDate,
) -> Result<HealthScoreBreakdown, DatabaseError> {
    store.update_family_member(member)?;
    refresh_health_score(store, calculator, &member.id, today)
}
