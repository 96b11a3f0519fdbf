//! Table-driven risk predictions.
//!
//! This is a heuristic placeholder: each row maps the presence of a condition
//! and/or medication to a fixed prediction. There is no learning and no
//! personalization beyond the lookup.

use super::types::{AggregatedHealthData, PredictionCandidate};

/// Confidence attached to every table prediction.
pub const PREDICTION_CONFIDENCE: f32 = 0.7;

struct RiskRow {
    requires_condition: Option<&'static str>,
    requires_medication: Option<&'static str>,
    predicts: &'static str,
    probability: f32,
    timeframe: &'static str,
    risk_factors: &'static [&'static str],
    prevention_tips: &'static [&'static str],
}

impl RiskRow {
    fn applies_to(&self, data: &AggregatedHealthData) -> bool {
        if self.requires_condition.is_none() && self.requires_medication.is_none() {
            return false;
        }
        self.requires_condition.map_or(true, |c| data.has_condition(c))
            && self.requires_medication.map_or(true, |m| data.has_medication(m))
    }

    fn to_candidate(&self) -> PredictionCandidate {
        PredictionCandidate {
            condition: self.predicts.to_string(),
            probability: self.probability,
            timeframe: self.timeframe.to_string(),
            risk_factors: self.risk_factors.iter().map(|s| s.to_string()).collect(),
            prevention_tips: self.prevention_tips.iter().map(|s| s.to_string()).collect(),
            confidence: PREDICTION_CONFIDENCE,
        }
    }
}

const RISK_TABLE: &[RiskRow] = &[
    RiskRow {
        requires_condition: Some("Diabetes"),
        requires_medication: None,
        predicts: "Cardiovascular Disease",
        probability: 0.75,
        timeframe: "5-10 years",
        risk_factors: &["Elevated blood glucose", "Insulin resistance", "Vascular inflammation"],
        prevention_tips: &[
            "Keep HbA1c within target range",
            "Exercise at least 150 minutes per week",
            "Monitor blood pressure and cholesterol",
        ],
    },
    RiskRow {
        requires_condition: None,
        requires_medication: Some("Lisinopril"),
        predicts: "Kidney Function Decline",
        probability: 0.45,
        timeframe: "10-15 years",
        risk_factors: &["Long-term ACE inhibitor use", "Underlying hypertension"],
        prevention_tips: &[
            "Check creatinine and potassium yearly",
            "Stay hydrated",
            "Avoid regular NSAID use",
        ],
    },
    RiskRow {
        requires_condition: Some("Diabetes"),
        requires_medication: Some("Metformin"),
        predicts: "Vitamin B12 Deficiency",
        probability: 0.3,
        timeframe: "3-5 years",
        risk_factors: &["Long-term metformin use"],
        prevention_tips: &["Check vitamin B12 levels yearly", "Include B12-rich foods"],
    },
    RiskRow {
        requires_condition: Some("Prediabetes"),
        requires_medication: None,
        predicts: "Type 2 Diabetes",
        probability: 0.5,
        timeframe: "3-5 years",
        risk_factors: &["Impaired fasting glucose", "Sedentary lifestyle"],
        prevention_tips: &[
            "Lose 5-7% of body weight if overweight",
            "Limit refined carbohydrates",
            "Recheck fasting glucose yearly",
        ],
    },
    RiskRow {
        requires_condition: Some("Hypertension"),
        requires_medication: None,
        predicts: "Stroke",
        probability: 0.35,
        timeframe: "10-15 years",
        risk_factors: &["Sustained high blood pressure", "Arterial stiffening"],
        prevention_tips: &[
            "Keep blood pressure below 130/80",
            "Reduce sodium intake",
            "Avoid smoking",
        ],
    },
    RiskRow {
        requires_condition: Some("Hyperlipidemia"),
        requires_medication: None,
        predicts: "Coronary Artery Disease",
        probability: 0.4,
        timeframe: "10-15 years",
        risk_factors: &["High LDL cholesterol", "Plaque build-up"],
        prevention_tips: &["Follow a heart-healthy diet", "Discuss statin therapy with a doctor"],
    },
    RiskRow {
        requires_condition: Some("Anemia"),
        requires_medication: None,
        predicts: "Chronic Fatigue",
        probability: 0.3,
        timeframe: "1-2 years",
        risk_factors: &["Low hemoglobin", "Reduced oxygen delivery"],
        prevention_tips: &["Treat the underlying iron deficiency", "Recheck hemoglobin in 3 months"],
    },
];

/// Maps aggregated health data to predictions via [`RISK_TABLE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskPredictor;

impl RiskPredictor {
    /// Matching predictions, one per predicted condition (highest probability
    /// wins), sorted by probability descending.
    pub fn predict(&self, data: &AggregatedHealthData) -> Vec<PredictionCandidate> {
        let mut predictions: Vec<PredictionCandidate> = Vec::new();
        for row in RISK_TABLE.iter().filter(|r| r.applies_to(data)) {
            let candidate = row.to_candidate();
            match predictions
                .iter_mut()
                .find(|p| p.condition == candidate.condition)
            {
                Some(existing) if existing.probability < candidate.probability => {
                    *existing = candidate
                }
                Some(_) => {}
                None => predictions.push(candidate),
            }
        }
        predictions.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        predictions
    }
}
