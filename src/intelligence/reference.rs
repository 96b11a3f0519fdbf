//! Static lookup tables used by the rule engine.
//!
//! Names are matched case-insensitively. Unknown names fall back to generic
//! values rather than failing.

/// Known medication: purpose and common side effects.
struct MedicationReference {
    name: &'static str,
    purpose: &'static str,
    side_effects: &'static [&'static str],
}

const MEDICATIONS: &[MedicationReference] = &[
    MedicationReference {
        name: "metformin",
        purpose: "Blood sugar control",
        side_effects: &["Nausea", "Diarrhea", "Stomach upset", "Metallic taste"],
    },
    MedicationReference {
        name: "lisinopril",
        purpose: "Blood pressure control",
        side_effects: &["Dry cough", "Dizziness", "Headache", "Elevated potassium"],
    },
    MedicationReference {
        name: "atorvastatin",
        purpose: "Cholesterol management",
        side_effects: &["Muscle pain", "Joint pain", "Digestive issues"],
    },
    MedicationReference {
        name: "amlodipine",
        purpose: "Blood pressure control",
        side_effects: &["Ankle swelling", "Flushing", "Fatigue"],
    },
    MedicationReference {
        name: "levothyroxine",
        purpose: "Thyroid hormone replacement",
        side_effects: &["Palpitations", "Insomnia", "Weight changes"],
    },
    MedicationReference {
        name: "omeprazole",
        purpose: "Acid reflux relief",
        side_effects: &["Headache", "Abdominal pain", "Nausea"],
    },
    MedicationReference {
        name: "aspirin",
        purpose: "Pain relief and blood thinning",
        side_effects: &["Stomach irritation", "Bleeding risk", "Heartburn"],
    },
    MedicationReference {
        name: "ibuprofen",
        purpose: "Pain and inflammation relief",
        side_effects: &["Stomach upset", "Heartburn", "Dizziness"],
    },
    MedicationReference {
        name: "amoxicillin",
        purpose: "Bacterial infection treatment",
        side_effects: &["Diarrhea", "Rash", "Nausea"],
    },
    MedicationReference {
        name: "cholecalciferol",
        purpose: "Vitamin D supplementation",
        side_effects: &["Nausea", "Constipation"],
    },
    MedicationReference {
        name: "insulin",
        purpose: "Blood sugar control",
        side_effects: &["Low blood sugar", "Injection site reaction", "Weight gain"],
    },
];

/// Side effects reported when a medication is not in the table.
pub const GENERIC_SIDE_EFFECTS: &[&str] = &["Nausea", "Headache", "Dizziness"];

pub const DEFAULT_PURPOSE: &str = "As prescribed";

pub const DEFAULT_SPECIALTY: &str = "General Medicine";

const SPECIALTIES: &[(&str, &str)] = &[
    ("diabetes", "Endocrinology"),
    ("prediabetes", "Endocrinology"),
    ("hypothyroidism", "Endocrinology"),
    ("hyperthyroidism", "Endocrinology"),
    ("hypertension", "Cardiology"),
    ("hyperlipidemia", "Cardiology"),
    ("anemia", "Hematology"),
    ("kidney function impairment", "Nephrology"),
];

fn find_medication(name: &str) -> Option<&'static MedicationReference> {
    let lower = name.trim().to_lowercase();
    MEDICATIONS.iter().find(|m| m.name == lower)
}

/// Side effects for a medication, falling back to [`GENERIC_SIDE_EFFECTS`].
pub fn side_effects_for(name: &str) -> Vec<String> {
    let effects = find_medication(name)
        .map(|m| m.side_effects)
        .unwrap_or(GENERIC_SIDE_EFFECTS);
    effects.iter().map(|s| s.to_string()).collect()
}

pub fn purpose_for(name: &str) -> String {
    find_medication(name)
        .map(|m| m.purpose)
        .unwrap_or(DEFAULT_PURPOSE)
        .to_string()
}

/// Specialty responsible for following up on a condition.
pub fn specialty_for(condition: &str) -> &'static str {
    let lower = condition.trim().to_lowercase();
    SPECIALTIES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, specialty)| *specialty)
        .unwrap_or(DEFAULT_SPECIALTY)
}
