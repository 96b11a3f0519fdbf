use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::HealthStatus;

/// A family member whose documents are analyzed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub id: Uuid,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Used only when `date_of_birth` is unknown.
    pub age: Option<u32>,
    pub conditions: Vec<String>,
    pub last_checkup: Option<NaiveDate>,
    pub next_appointment: Option<NaiveDate>,
    /// Active medications; computed by the store on read, ignored on write.
    pub medication_count: u32,
    pub health_score: Option<u8>,
    pub health_status: Option<HealthStatus>,
}

impl FamilyMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            date_of_birth: None,
            age: None,
            conditions: Vec::new(),
            last_checkup: None,
            next_appointment: None,
            medication_count: 0,
            health_score: None,
            health_status: None,
        }
    }

    /// Age in whole years on `today`; date of birth wins over the stored age.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        match self.date_of_birth {
            Some(dob) => Some(years_between(dob, today)),
            None => self.age,
        }
    }
}

fn years_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    years.max(0) as u32
}
