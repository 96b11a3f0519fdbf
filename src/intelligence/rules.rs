//! Lab-value rule table.
//!
//! Each row pairs a test-name matcher with a numeric trigger and the findings
//! it produces. Rows are evaluated in order; every matching row fires. The
//! thresholds are fixed heuristics, not a diagnostic model.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{
    AlertFinding, ClinicalFinding, ConditionFinding, RecommendationFinding,
};
use crate::models::enums::{
    AlertSeverity, ConditionSeverity, ConditionStatus, Priority, RecommendationType,
};

/// Numeric trigger on a lab value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    Above(f64),
    Below(f64),
    /// `above < value <= up_to`
    Between { above: f64, up_to: f64 },
}

impl Threshold {
    pub fn is_triggered(&self, value: f64) -> bool {
        match *self {
            Self::Above(limit) => value > limit,
            Self::Below(limit) => value < limit,
            Self::Between { above, up_to } => value > above && value <= up_to,
        }
    }
}

/// Substring matcher over normalized test names (see [`normalize_test_name`]).
#[derive(Debug, Clone, Copy)]
pub struct TestMatcher {
    pub any_of: &'static [&'static str],
    pub none_of: &'static [&'static str],
}

impl TestMatcher {
    pub fn matches(&self, normalized: &str) -> bool {
        self.any_of.iter().any(|k| normalized.contains(k))
            && !self.none_of.iter().any(|k| normalized.contains(k))
    }
}

/// Shape of a finding a rule emits; filled in with the test name and the
/// rule's confidence when the rule fires.
#[derive(Debug, Clone, Copy)]
pub enum FindingTemplate {
    Condition {
        name: &'static str,
        severity: ConditionSeverity,
        status: ConditionStatus,
    },
    Alert {
        message: &'static str,
        severity: AlertSeverity,
        action_required: bool,
    },
    Recommendation {
        kind: RecommendationType,
        title: &'static str,
        description: &'static str,
        priority: Priority,
        timeframe: &'static str,
    },
}

impl FindingTemplate {
    fn instantiate(&self, source_test: &str, confidence: f32) -> ClinicalFinding {
        match *self {
            Self::Condition { name, severity, status } => {
                ClinicalFinding::Condition(ConditionFinding {
                    name: name.to_string(),
                    severity,
                    status,
                    source_test: source_test.to_string(),
                    confidence,
                })
            }
            Self::Alert { message, severity, action_required } => {
                ClinicalFinding::Alert(AlertFinding {
                    message: message.to_string(),
                    severity,
                    action_required,
                    source_test: source_test.to_string(),
                    confidence,
                })
            }
            Self::Recommendation { kind, title, description, priority, timeframe } => {
                ClinicalFinding::Recommendation(RecommendationFinding {
                    recommendation_type: kind,
                    title: title.to_string(),
                    description: description.to_string(),
                    priority,
                    timeframe: timeframe.to_string(),
                    confidence,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LabRule {
    pub id: &'static str,
    pub test: TestMatcher,
    pub trigger: Threshold,
    pub findings: &'static [FindingTemplate],
    /// Fixed per rule; independent of extraction confidence.
    pub confidence: f32,
}

impl LabRule {
    /// Findings for `value`, or nothing when the rule does not apply.
    pub fn evaluate(&self, test_name: &str, normalized: &str, value: f64) -> Vec<ClinicalFinding> {
        if !self.test.matches(normalized) || !self.trigger.is_triggered(value) {
            return Vec::new();
        }
        self.findings
            .iter()
            .map(|t| t.instantiate(test_name, self.confidence))
            .collect()
    }
}

const GLUCOSE: &[&str] = &["glucose", "bloodsugar", "fbs"];
const HBA1C: &[&str] = &["hba1c", "a1c", "glycatedh", "glycosylatedh"];
const HEMOGLOBIN: &[&str] = &["hemoglobin", "haemoglobin", "hgb"];
const VITAMIN_D: &[&str] = &["vitamind", "25ohd", "25hydroxy", "calcidiol"];
const TSH: &[&str] = &["tsh", "thyroidstimulating"];

const HYPERTENSION: FindingTemplate = FindingTemplate::Condition {
    name: "Hypertension",
    severity: ConditionSeverity::Moderate,
    status: ConditionStatus::Active,
};

const THYROID_RECHECK: FindingTemplate = FindingTemplate::Recommendation {
    kind: RecommendationType::Test,
    title: "Repeat thyroid panel",
    description: "Repeat TSH with free T4 to confirm thyroid function.",
    priority: Priority::Medium,
    timeframe: "Within 1 month",
};

/// Ordered rule table.
pub const LAB_RULES: &[LabRule] = &[
    LabRule {
        id: "glucose-diabetes",
        test: TestMatcher { any_of: GLUCOSE, none_of: &[] },
        trigger: Threshold::Above(126.0),
        findings: &[
            FindingTemplate::Condition {
                name: "Diabetes",
                severity: ConditionSeverity::Moderate,
                status: ConditionStatus::Active,
            },
            FindingTemplate::Recommendation {
                kind: RecommendationType::Lifestyle,
                title: "Dietary modification",
                description: "Reduce refined sugar intake and monitor blood glucose regularly.",
                priority: Priority::High,
                timeframe: "Immediate",
            },
        ],
        confidence: 0.85,
    },
    LabRule {
        id: "glucose-critical",
        test: TestMatcher { any_of: GLUCOSE, none_of: &[] },
        trigger: Threshold::Above(300.0),
        findings: &[FindingTemplate::Alert {
            message: "Very high blood glucose level detected",
            severity: AlertSeverity::Critical,
            action_required: true,
        }],
        confidence: 0.9,
    },
    LabRule {
        id: "glucose-prediabetes",
        test: TestMatcher { any_of: GLUCOSE, none_of: &[] },
        trigger: Threshold::Between { above: 100.0, up_to: 126.0 },
        findings: &[
            FindingTemplate::Condition {
                name: "Prediabetes",
                severity: ConditionSeverity::Mild,
                status: ConditionStatus::Monitoring,
            },
            FindingTemplate::Recommendation {
                kind: RecommendationType::Lifestyle,
                title: "Increase physical activity",
                description: "Aim for 150 minutes of moderate exercise per week and limit sugary drinks.",
                priority: Priority::Medium,
                timeframe: "Within 1 month",
            },
        ],
        confidence: 0.75,
    },
    LabRule {
        id: "hba1c-diabetes",
        test: TestMatcher { any_of: HBA1C, none_of: &[] },
        trigger: Threshold::Above(6.5),
        findings: &[FindingTemplate::Condition {
            name: "Diabetes",
            severity: ConditionSeverity::Moderate,
            status: ConditionStatus::Active,
        }],
        confidence: 0.85,
    },
    LabRule {
        id: "cholesterol-high",
        test: TestMatcher { any_of: &["cholesterol"], none_of: &["hdl", "ldl"] },
        trigger: Threshold::Above(200.0),
        findings: &[FindingTemplate::Alert {
            message: "High cholesterol levels detected",
            severity: AlertSeverity::Warning,
            action_required: true,
        }],
        confidence: 0.8,
    },
    LabRule {
        id: "ldl-high",
        test: TestMatcher { any_of: &["ldl"], none_of: &["vldl"] },
        trigger: Threshold::Above(160.0),
        findings: &[
            FindingTemplate::Alert {
                message: "High LDL cholesterol detected",
                severity: AlertSeverity::Warning,
                action_required: true,
            },
            FindingTemplate::Recommendation {
                kind: RecommendationType::Lifestyle,
                title: "Heart-healthy diet",
                description: "Cut saturated fats and add fiber-rich foods to lower LDL cholesterol.",
                priority: Priority::Medium,
                timeframe: "Within 1 month",
            },
        ],
        confidence: 0.8,
    },
    LabRule {
        id: "ldl-very-high",
        test: TestMatcher { any_of: &["ldl"], none_of: &["vldl"] },
        trigger: Threshold::Above(190.0),
        findings: &[FindingTemplate::Condition {
            name: "Hyperlipidemia",
            severity: ConditionSeverity::Moderate,
            status: ConditionStatus::Active,
        }],
        confidence: 0.8,
    },
    LabRule {
        id: "hdl-low",
        test: TestMatcher { any_of: &["hdl"], none_of: &[] },
        trigger: Threshold::Below(40.0),
        findings: &[FindingTemplate::Recommendation {
            kind: RecommendationType::Lifestyle,
            title: "Raise HDL cholesterol",
            description: "Regular aerobic exercise and quitting smoking help raise HDL.",
            priority: Priority::Medium,
            timeframe: "Within 3 months",
        }],
        confidence: 0.7,
    },
    LabRule {
        id: "triglycerides-high",
        test: TestMatcher { any_of: &["triglyceride"], none_of: &[] },
        trigger: Threshold::Above(150.0),
        findings: &[FindingTemplate::Recommendation {
            kind: RecommendationType::Lifestyle,
            title: "Reduce triglycerides",
            description: "Limit alcohol, sugar and refined carbohydrates.",
            priority: Priority::Medium,
            timeframe: "Within 1 month",
        }],
        confidence: 0.75,
    },
    LabRule {
        id: "vitamin-d-low",
        test: TestMatcher { any_of: VITAMIN_D, none_of: &[] },
        trigger: Threshold::Below(30.0),
        findings: &[FindingTemplate::Recommendation {
            kind: RecommendationType::Medication,
            title: "Vitamin D supplementation",
            description: "Consider vitamin D supplements and regular safe sun exposure.",
            priority: Priority::Medium,
            timeframe: "Within 1 week",
        }],
        confidence: 0.8,
    },
    LabRule {
        id: "hemoglobin-low",
        test: TestMatcher { any_of: HEMOGLOBIN, none_of: &["a1c", "glycated", "glycosylated"] },
        trigger: Threshold::Below(12.0),
        findings: &[
            FindingTemplate::Condition {
                name: "Anemia",
                severity: ConditionSeverity::Moderate,
                status: ConditionStatus::Active,
            },
            FindingTemplate::Recommendation {
                kind: RecommendationType::Lifestyle,
                title: "Iron-rich diet",
                description: "Include leafy greens, legumes and lean meat; pair with vitamin C for absorption.",
                priority: Priority::Medium,
                timeframe: "Within 2 weeks",
            },
        ],
        confidence: 0.8,
    },
    LabRule {
        id: "creatinine-high",
        test: TestMatcher { any_of: &["creatinine"], none_of: &["clearance"] },
        trigger: Threshold::Above(1.3),
        findings: &[
            FindingTemplate::Alert {
                message: "Elevated creatinine; kidney function should be reviewed",
                severity: AlertSeverity::Warning,
                action_required: true,
            },
            FindingTemplate::Recommendation {
                kind: RecommendationType::Test,
                title: "Kidney function panel",
                description: "Repeat creatinine with eGFR and urine albumin.",
                priority: Priority::Medium,
                timeframe: "Within 2 weeks",
            },
        ],
        confidence: 0.8,
    },
    LabRule {
        id: "tsh-high",
        test: TestMatcher { any_of: TSH, none_of: &[] },
        trigger: Threshold::Above(4.5),
        findings: &[
            FindingTemplate::Condition {
                name: "Hypothyroidism",
                severity: ConditionSeverity::Mild,
                status: ConditionStatus::Monitoring,
            },
            THYROID_RECHECK,
        ],
        confidence: 0.75,
    },
    LabRule {
        id: "tsh-low",
        test: TestMatcher { any_of: TSH, none_of: &[] },
        trigger: Threshold::Below(0.4),
        findings: &[
            FindingTemplate::Condition {
                name: "Hyperthyroidism",
                severity: ConditionSeverity::Mild,
                status: ConditionStatus::Monitoring,
            },
            THYROID_RECHECK,
        ],
        confidence: 0.75,
    },
    LabRule {
        id: "potassium-high",
        test: TestMatcher { any_of: &["potassium"], none_of: &[] },
        trigger: Threshold::Above(5.5),
        findings: &[FindingTemplate::Alert {
            message: "High potassium level detected",
            severity: AlertSeverity::Critical,
            action_required: true,
        }],
        confidence: 0.85,
    },
    LabRule {
        id: "potassium-low",
        test: TestMatcher { any_of: &["potassium"], none_of: &[] },
        trigger: Threshold::Below(3.5),
        findings: &[FindingTemplate::Alert {
            message: "Low potassium level detected",
            severity: AlertSeverity::Warning,
            action_required: true,
        }],
        confidence: 0.8,
    },
    LabRule {
        id: "systolic-high",
        test: TestMatcher { any_of: &["systolic"], none_of: &[] },
        trigger: Threshold::Above(140.0),
        findings: &[
            HYPERTENSION,
            FindingTemplate::Recommendation {
                kind: RecommendationType::Lifestyle,
                title: "Reduce salt intake",
                description: "Keep sodium under 2 g per day and monitor blood pressure at home.",
                priority: Priority::High,
                timeframe: "Within 1 week",
            },
        ],
        confidence: 0.8,
    },
    LabRule {
        id: "diastolic-high",
        test: TestMatcher { any_of: &["diastolic"], none_of: &[] },
        trigger: Threshold::Above(90.0),
        findings: &[HYPERTENSION],
        confidence: 0.8,
    },
];

/// Lowercase, alphanumerics only: "Vitamin D (25-OH)" → "vitamind25oh".
pub fn normalize_test_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

static RE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());

/// First number in a lab value string ("130 mg/dL", "<5.0", "1,250").
/// Commas are treated as thousands separators.
pub fn parse_lab_value(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    RE_NUMBER
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str) -> &'static LabRule {
        LAB_RULES.iter().find(|r| r.id == id).unwrap()
    }

    fn fire(id: &str, test: &str, value: f64) -> Vec<ClinicalFinding> {
        rule(id).evaluate(test, &normalize_test_name(test), value)
    }

    #[test]
    fn rule_ids_are_unique() {
        let mut ids: Vec<&str> = LAB_RULES.iter().map(|r| r.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), LAB_RULES.len());
    }

    #[test]
    fn rule_confidences_in_unit_range() {
        for r in LAB_RULES {
            assert!((0.0..=1.0).contains(&r.confidence), "{}", r.id);
        }
    }

    #[test]
    fn threshold_boundaries() {
        assert!(!Threshold::Above(126.0).is_triggered(126.0));
        assert!(Threshold::Above(126.0).is_triggered(126.1));
        assert!(!Threshold::Below(30.0).is_triggered(30.0));
        assert!(Threshold::Below(30.0).is_triggered(29.9));
        let between = Threshold::Between { above: 100.0, up_to: 126.0 };
        assert!(!between.is_triggered(100.0));
        assert!(between.is_triggered(126.0));
        assert!(!between.is_triggered(126.5));
    }

    #[test]
    fn glucose_diabetes_row() {
        let findings = fire("glucose-diabetes", "Glucose", 130.0);
        assert_eq!(findings.len(), 2);
        match &findings[0] {
            ClinicalFinding::Condition(c) => {
                assert_eq!(c.name, "Diabetes");
                assert_eq!(c.severity, ConditionSeverity::Moderate);
                assert_eq!(c.status, ConditionStatus::Active);
            }
            other => panic!("expected condition, got {other:?}"),
        }
        match &findings[1] {
            ClinicalFinding::Recommendation(r) => {
                assert_eq!(r.recommendation_type, RecommendationType::Lifestyle);
                assert_eq!(r.priority, Priority::High);
                assert_eq!(r.timeframe, "Immediate");
            }
            other => panic!("expected recommendation, got {other:?}"),
        }
        assert!(fire("glucose-diabetes", "Glucose", 126.0).is_empty());
    }

    #[test]
    fn glucose_prediabetes_row() {
        assert!(fire("glucose-prediabetes", "Fasting Glucose", 95.0).is_empty());
        let findings = fire("glucose-prediabetes", "Fasting Glucose", 110.0);
        assert!(matches!(&findings[0], ClinicalFinding::Condition(c) if c.name == "Prediabetes"));
    }

    #[test]
    fn glucose_critical_row() {
        assert!(fire("glucose-critical", "Glucose", 250.0).is_empty());
        let findings = fire("glucose-critical", "Glucose", 320.0);
        assert!(matches!(&findings[0], ClinicalFinding::Alert(a) if a.severity == AlertSeverity::Critical));
    }

    #[test]
    fn hba1c_row() {
        let findings = fire("hba1c-diabetes", "HbA1c", 7.1);
        assert!(matches!(&findings[0], ClinicalFinding::Condition(c) if c.name == "Diabetes"));
        assert!(fire("hba1c-diabetes", "HbA1c", 5.6).is_empty());
    }

    #[test]
    fn cholesterol_row() {
        let findings = fire("cholesterol-high", "Total Cholesterol", 220.0);
        assert_eq!(findings.len(), 1);
        match &findings[0] {
            ClinicalFinding::Alert(a) => {
                assert_eq!(a.severity, AlertSeverity::Warning);
                assert!(a.action_required);
            }
            other => panic!("expected alert, got {other:?}"),
        }
    }

    #[test]
    fn cholesterol_row_skips_hdl_and_ldl() {
        assert!(fire("cholesterol-high", "HDL Cholesterol", 220.0).is_empty());
        assert!(fire("cholesterol-high", "LDL Cholesterol", 220.0).is_empty());
    }

    #[test]
    fn ldl_rows() {
        assert_eq!(fire("ldl-high", "LDL Cholesterol", 170.0).len(), 2);
        assert!(fire("ldl-very-high", "LDL Cholesterol", 170.0).is_empty());
        assert!(fire("ldl-high", "VLDL", 170.0).is_empty());
        let findings = fire("ldl-very-high", "LDL", 200.0);
        assert!(matches!(&findings[0], ClinicalFinding::Condition(c) if c.name == "Hyperlipidemia"));
    }

    #[test]
    fn hdl_row() {
        assert_eq!(fire("hdl-low", "HDL", 35.0).len(), 1);
        assert!(fire("hdl-low", "HDL", 55.0).is_empty());
    }

    #[test]
    fn triglycerides_row() {
        assert_eq!(fire("triglycerides-high", "Triglycerides", 180.0).len(), 1);
    }

    #[test]
    fn vitamin_d_row() {
        let findings = fire("vitamin-d-low", "Vitamin D (25-OH)", 18.0);
        match &findings[0] {
            ClinicalFinding::Recommendation(r) => {
                assert_eq!(r.recommendation_type, RecommendationType::Medication);
                assert_eq!(r.priority, Priority::Medium);
                assert_eq!(r.timeframe, "Within 1 week");
            }
            other => panic!("expected recommendation, got {other:?}"),
        }
        assert!(fire("vitamin-d-low", "VitaminD", 30.0).is_empty());
    }

    #[test]
    fn hemoglobin_row_excludes_a1c() {
        let findings = fire("hemoglobin-low", "Hemoglobin", 10.5);
        assert!(matches!(&findings[0], ClinicalFinding::Condition(c) if c.name == "Anemia"));
        assert!(fire("hemoglobin-low", "Hemoglobin A1c", 6.0).is_empty());
        assert!(fire("hemoglobin-low", "Hemoglobin", 14.2).is_empty());
    }

    #[test]
    fn creatinine_row() {
        assert_eq!(fire("creatinine-high", "Creatinine", 1.8).len(), 2);
        assert!(fire("creatinine-high", "Creatinine Clearance", 1.8).is_empty());
    }

    #[test]
    fn thyroid_rows() {
        assert!(matches!(&fire("tsh-high", "TSH", 6.0)[0], ClinicalFinding::Condition(c) if c.name == "Hypothyroidism"));
        assert!(matches!(&fire("tsh-low", "TSH", 0.1)[0], ClinicalFinding::Condition(c) if c.name == "Hyperthyroidism"));
        assert!(fire("tsh-high", "TSH", 2.0).is_empty());
    }

    #[test]
    fn potassium_rows() {
        assert!(matches!(&fire("potassium-high", "Potassium", 6.1)[0], ClinicalFinding::Alert(a) if a.severity == AlertSeverity::Critical));
        assert!(matches!(&fire("potassium-low", "Potassium", 3.1)[0], ClinicalFinding::Alert(a) if a.severity == AlertSeverity::Warning));
    }

    #[test]
    fn blood_pressure_rows() {
        assert_eq!(fire("systolic-high", "Systolic BP", 150.0).len(), 2);
        assert!(matches!(&fire("diastolic-high", "Diastolic BP", 95.0)[0], ClinicalFinding::Condition(c) if c.name == "Hypertension"));
    }

    #[test]
    fn findings_carry_rule_confidence() {
        let findings = fire("glucose-diabetes", "Glucose", 200.0);
        assert!(findings.iter().all(|f| (f.confidence() - 0.85).abs() < f32::EPSILON));
    }

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(normalize_test_name("Vitamin D (25-OH)"), "vitamind25oh");
        assert_eq!(normalize_test_name("HbA1c"), "hba1c");
    }

    #[test]
    fn parse_values() {
        assert_eq!(parse_lab_value("130"), Some(130.0));
        assert_eq!(parse_lab_value("14.2 g/dL"), Some(14.2));
        assert_eq!(parse_lab_value("<5.0"), Some(5.0));
        assert_eq!(parse_lab_value("1,250 cells"), Some(1250.0));
        assert_eq!(parse_lab_value("positive"), None);
        assert_eq!(parse_lab_value(""), None);
    }
}
