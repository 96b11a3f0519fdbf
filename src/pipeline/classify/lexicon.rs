//! Medical vocabulary used by the classifier, grouped by how strongly each
//! kind of term signals a health document.

use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermCategory {
    LabTest,
    Condition,
    Medication,
    Clinical,
}

impl TermCategory {
    /// Score contributed by one distinct term of this category.
    pub fn weight(&self) -> f32 {
        match self {
            Self::LabTest => 0.25,
            Self::Condition => 0.20,
            Self::Medication => 0.15,
            Self::Clinical => 0.10,
        }
    }
}

pub struct LexiconTerm {
    /// Shown in `matched_terms`.
    pub label: &'static str,
    /// Alternation matched case-insensitively on word boundaries.
    pub pattern: &'static str,
    pub category: TermCategory,
}

const fn term(label: &'static str, pattern: &'static str, category: TermCategory) -> LexiconTerm {
    LexiconTerm {
        label,
        pattern,
        category,
    }
}

use TermCategory::{Clinical, Condition, LabTest, Medication};

pub const LEXICON: &[LexiconTerm] = &[
    // Lab tests
    term("Hemoglobin", r"hemoglobin|haemoglobin", LabTest),
    term("Glucose", r"glucose|blood\s+sugar", LabTest),
    term("HbA1c", r"hba1c|a1c", LabTest),
    term("Cholesterol", r"cholesterol", LabTest),
    term("LDL", r"ldl", LabTest),
    term("HDL", r"hdl", LabTest),
    term("Triglycerides", r"triglycerides?", LabTest),
    term("Creatinine", r"creatinine", LabTest),
    term("TSH", r"tsh|thyroid\s+stimulating\s+hormone", LabTest),
    term("Vitamin D", r"vitamin\s*d\d?", LabTest),
    term("Platelets", r"platelets?(?:\s+count)?", LabTest),
    term("WBC", r"wbc|white\s+blood\s+cells?", LabTest),
    term("Potassium", r"potassium", LabTest),
    term("Sodium", r"sodium", LabTest),
    term("Bilirubin", r"bilirubin", LabTest),
    term("Blood Pressure", r"blood\s+pressure", LabTest),
    // Conditions
    term("Diabetes", r"diabetes|diabetic", Condition),
    term("Prediabetes", r"pre-?diabetes", Condition),
    term("Hypertension", r"hypertension|hypertensive", Condition),
    term("Anemia", r"anaemia|anemia|anemic", Condition),
    term("Hyperlipidemia", r"hyperlipidemia|dyslipidemia", Condition),
    term("Hypothyroidism", r"hypothyroidism|hyperthyroidism", Condition),
    term("Asthma", r"asthma", Condition),
    term("Infection", r"infection", Condition),
    term("Kidney Disease", r"(?:chronic\s+)?kidney\s+disease|ckd", Condition),
    // Medication vocabulary
    term("Prescription", r"prescription|prescribed|rx", Medication),
    term("Tablet", r"tablets?|tabs?", Medication),
    term("Capsule", r"capsules?|caps", Medication),
    term("Dosage", r"dosage|dose", Medication),
    term("Twice Daily", r"twice\s+daily|once\s+daily|bid|tid|qid", Medication),
    term("Metformin", r"metformin", Medication),
    term("Lisinopril", r"lisinopril", Medication),
    term("Atorvastatin", r"atorvastatin", Medication),
    // Clinical vocabulary
    term("Doctor", r"dr\.?\s+[a-z]+|doctor|physician", Clinical),
    term("Patient", r"patient", Clinical),
    term("Diagnosis", r"diagnosis|diagnosed", Clinical),
    term("Laboratory", r"laboratory|pathology", Clinical),
    term("Hospital", r"hospital|clinic", Clinical),
    term("Specimen", r"specimen|sample\s+collected", Clinical),
    term("Reference Range", r"reference\s+(?:range|interval)|normal\s+range", Clinical),
    term("mg/dL", r"mg/dl", Clinical),
    term("g/dL", r"g/dl", Clinical),
    term("mmol/L", r"mmol/l", Clinical),
    term("ng/mL", r"ng/ml", Clinical),
];

pub struct CompiledTerm {
    pub regex: Regex,
    pub term: &'static LexiconTerm,
}

pub static COMPILED_LEXICON: LazyLock<Vec<CompiledTerm>> = LazyLock::new(|| {
    LEXICON
        .iter()
        .map(|term| CompiledTerm {
            // `\b` before a unit like "g/dL" needs a word char, which every
            // pattern starts with; the trailing boundary is skipped after "/L".
            regex: Regex::new(&format!(r"(?i)\b(?:{})(?:\b|$)", term.pattern)).unwrap(),
            term,
        })
        .collect()
});

/// Patterns marking a document as certainly not medical (academic records).
pub static EXPLICIT_REJECTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bmark\s*-?\s*sheets?\b",
        r"\bgrade\s+card\b",
        r"\btranscript\s+of\s+records?\b",
        r"\bsemester\b",
        r"\bsem\s*-?\s*\d{1,2}\b",
        r"\b[cs]gpa\b",
        r"\broll\s*(?:no\.?|number)\b",
        r"\buniversity\s+exam(?:ination)?s?\s+results?\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
    .collect()
});
