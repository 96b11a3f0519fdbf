//! Clinical interpretation of extracted documents.
//!
//! Everything in here is pure and synchronous except
//! [`score::refresh_health_score`], which reads and writes through a
//! [`crate::db::HealthStore`].

pub mod engine;
pub mod medication;
pub mod prediction;
pub mod reference;
pub mod rules;
pub mod score;
pub mod types;

pub use engine::ClinicalRuleEngine;
pub use prediction::RiskPredictor;
pub use score::{
    edit_family_member, refresh_health_score, register_family_member, HealthScoreCalculator,
};
pub use types::*;
