//! Line-oriented lexical entity scanner for plain-text reports.
//!
//! Recognizes lab values, medication lines, provider names, facilities and
//! dates. Anything it cannot place is ignored.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::types::ExtractedEntities;
use crate::intelligence::medication::parse_medication_mention;
use crate::intelligence::rules::normalize_test_name;

/// `{test name} [:=] {number} [unit]`
static RE_LAB_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[A-Za-z][A-Za-z0-9 ()\-]*?)\s*(?:[:=]\s*|\s+)(?P<value>[<>]?\s*\d[\d,]*(?:\.\d+)?(?:\s*[A-Za-zµ%][A-Za-z0-9µ%/^.]*)?)",
    )
    .unwrap()
});

static RE_BLOOD_PRESSURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:blood\s+pressure|bp)\b\s*[:=]?\s*(\d{2,3})\s*/\s*(\d{2,3})").unwrap()
});

static RE_PROVIDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bDr\.?\s+([A-Z][A-Za-z'\-]+(?:\s+[A-Z][A-Za-z'\-]+){0,2})").unwrap()
});

static RE_FACILITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:hospital|clinic|laborator(?:y|ies)|medical\s+cent(?:er|re)|diagnostics?)\b")
        .unwrap()
});

static RE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4}-\d{2}-\d{2}|\d{1,2}[/-]\d{1,2}[/-]\d{4})\b").unwrap()
});

static RE_LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•]|\d{1,2}[.)])\s*").unwrap());

/// Normalized fragments identifying a lab test name.
const LAB_KEYWORDS: &[&str] = &[
    "glucose",
    "hba1c",
    "a1c",
    "hemoglobin",
    "haemoglobin",
    "cholesterol",
    "ldl",
    "hdl",
    "triglyceride",
    "vitamind",
    "creatinine",
    "tsh",
    "thyroid",
    "potassium",
    "sodium",
    "systolic",
    "diastolic",
    "wbc",
    "rbc",
    "platelet",
    "ferritin",
    "b12",
    "bilirubin",
];

const MAX_FACILITY_LEN: usize = 120;

pub fn is_known_lab_test(name: &str) -> bool {
    let normalized = normalize_test_name(name);
    !normalized.is_empty() && LAB_KEYWORDS.iter().any(|k| normalized.contains(k))
}

/// Scan sanitized text line by line.
pub fn scan_entities(text: &str) -> ExtractedEntities {
    let mut entities = ExtractedEntities::default();

    for raw_line in text.lines() {
        let line = RE_LIST_MARKER.replace(raw_line.trim(), "");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut is_lab_line = false;
        if let Some(caps) = RE_BLOOD_PRESSURE.captures(line) {
            entities
                .lab_values
                .entry("Systolic BP".into())
                .or_insert_with(|| caps[1].to_string());
            entities
                .lab_values
                .entry("Diastolic BP".into())
                .or_insert_with(|| caps[2].to_string());
            is_lab_line = true;
        } else if let Some(caps) = RE_LAB_LINE.captures(line) {
            let name = caps["name"].trim();
            if is_known_lab_test(name) {
                entities
                    .lab_values
                    .entry(name.to_string())
                    .or_insert_with(|| caps["value"].trim().to_string());
                is_lab_line = true;
            }
        }

        if !is_lab_line
            && parse_medication_mention(line, 1.0).is_some()
            && !entities.medication_mentions.iter().any(|m| m == line)
        {
            entities.medication_mentions.push(line.to_string());
        }

        for caps in RE_PROVIDER.captures_iter(line) {
            push_unique(&mut entities.providers, format!("Dr. {}", &caps[1]));
        }

        if RE_FACILITY.is_match(line) {
            let facility: String = line.chars().take(MAX_FACILITY_LEN).collect();
            push_unique(&mut entities.facilities, facility);
        }

        for caps in RE_DATE.captures_iter(line) {
            if let Some(date) = parse_document_date(&caps[1]) {
                push_unique(&mut entities.dates, date.to_string());
            }
        }
    }

    tracing::debug!(
        lab_values = entities.lab_values.len(),
        medications = entities.medication_mentions.len(),
        providers = entities.providers.len(),
        dates = entities.dates.len(),
        "Entity scan complete"
    );
    entities
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Parse a date found in a report.
/// Supports: ISO 8601, DD/MM/YYYY, DD-MM-YYYY, MM/DD/YYYY (day-first wins
/// when both readings are valid).
pub fn parse_document_date(date_str: &str) -> Option<NaiveDate> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    // ISO 8601: YYYY-MM-DD
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(d);
    }
    // DD/MM/YYYY
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") {
        return Some(d);
    }
    // DD-MM-YYYY
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%d-%m-%Y") {
        return Some(d);
    }
    // US: MM/DD/YYYY
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%m/%d/%Y") {
        return Some(d);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "City General Hospital - Pathology Laboratory
Patient: Jane Doe
Date: 2026-02-14
Referring physician: Dr. Sarah Johnson
Hemoglobin 14.2 g/dL
Glucose: 130 mg/dL
Total Cholesterol = 220 mg/dL
Vitamin D: 18 ng/mL
Blood Pressure: 150/95 mmHg
Medications:
- Metformin 500mg twice daily
- Lisinopril 10 mg once daily
Follow up on 03/04/2026";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn scans_lab_values() {
        let e = scan_entities(REPORT);
        assert_eq!(e.lab_values.get("Hemoglobin").map(String::as_str), Some("14.2 g/dL"));
        assert_eq!(e.lab_values.get("Glucose").map(String::as_str), Some("130 mg/dL"));
        assert_eq!(
            e.lab_values.get("Total Cholesterol").map(String::as_str),
            Some("220 mg/dL")
        );
        assert_eq!(e.lab_values.get("Vitamin D").map(String::as_str), Some("18 ng/mL"));
        assert_eq!(e.lab_values.get("Systolic BP").map(String::as_str), Some("150"));
        assert_eq!(e.lab_values.get("Diastolic BP").map(String::as_str), Some("95"));
        assert!(!e.lab_values.contains_key("Date"));
        assert!(!e.lab_values.contains_key("Metformin"));
    }

    #[test]
    fn scans_medication_lines() {
        let e = scan_entities(REPORT);
        assert_eq!(
            e.medication_mentions,
            vec!["Metformin 500mg twice daily", "Lisinopril 10 mg once daily"]
        );
    }

    #[test]
    fn scans_provider_facility_and_dates() {
        let e = scan_entities(REPORT);
        assert_eq!(e.providers, vec!["Dr. Sarah Johnson"]);
        assert_eq!(e.facilities.len(), 1);
        assert!(e.facilities[0].starts_with("City General Hospital"));
        assert_eq!(e.dates, vec!["2026-02-14", "2026-04-03"]);
        assert_eq!(e.parsed_dates(), vec![date(2026, 2, 14), date(2026, 4, 3)]);
    }

    #[test]
    fn lab_lines_are_not_medications() {
        let e = scan_entities("Glucose 95 mg/dL\nCreatinine 1.1 mg/dL");
        assert!(e.medication_mentions.is_empty());
        assert_eq!(e.lab_values.len(), 2);
    }

    #[test]
    fn first_value_for_a_test_wins() {
        let e = scan_entities("Glucose: 130\nGlucose: 90");
        assert_eq!(e.lab_values["Glucose"], "130");
    }

    #[test]
    fn prose_yields_nothing() {
        let e = scan_entities("Semester results were announced today.\nWell done everyone");
        assert!(e.is_empty());
    }

    #[test]
    fn known_lab_names() {
        assert!(is_known_lab_test("HbA1c"));
        assert!(is_known_lab_test("LDL Cholesterol"));
        assert!(is_known_lab_test("Vitamin D (25-OH)"));
        assert!(!is_known_lab_test("Roll No"));
        assert!(!is_known_lab_test("Date"));
    }

    #[test]
    fn parse_date_formats() {
        assert_eq!(parse_document_date("2024-01-15"), Some(date(2024, 1, 15)));
        assert_eq!(parse_document_date("15/01/2024"), Some(date(2024, 1, 15)));
        assert_eq!(parse_document_date("15-01-2024"), Some(date(2024, 1, 15)));
        assert_eq!(parse_document_date("01/25/2024"), Some(date(2024, 1, 25)));
        assert_eq!(parse_document_date("31/31/2024"), None);
        assert_eq!(parse_document_date(""), None);
    }
}
