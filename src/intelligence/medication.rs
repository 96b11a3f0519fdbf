use std::sync::LazyLock;

use regex::Regex;

use super::reference::{purpose_for, side_effects_for};
use super::types::MedicationCandidate;

/// `{name} {quantity}{unit} {rest}`; rest becomes the frequency.
static RE_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*([a-z][a-z\-]*)\s+(\d+(?:\.\d+)?\s*(?:mg|mcg|µg|ug|g|ml|iu|units?))\b[\s,;:\-]*(.*?)\s*$",
    )
    .unwrap()
});

pub const DEFAULT_FREQUENCY: &str = "As directed";

/// Parse one free-text medication mention. Returns `None` when the mention
/// does not carry both a name and a dosage.
pub fn parse_medication_mention(mention: &str, confidence: f32) -> Option<MedicationCandidate> {
    let caps = RE_MENTION.captures(mention)?;
    let name = title_case(caps.get(1)?.as_str());
    let dosage = normalize_dosage(caps.get(2)?.as_str());
    let frequency = caps
        .get(3)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FREQUENCY)
        .to_string();

    Some(MedicationCandidate {
        purpose: purpose_for(&name),
        side_effects: side_effects_for(&name),
        name,
        dosage,
        frequency,
        confidence: confidence.clamp(0.0, 1.0),
    })
}

/// Parse every mention, dropping unparseable ones and collapsing repeats of
/// the same name + dosage.
pub fn parse_medication_mentions(mentions: &[String], confidence: f32) -> Vec<MedicationCandidate> {
    let mut parsed: Vec<MedicationCandidate> = Vec::new();
    for mention in mentions {
        let Some(candidate) = parse_medication_mention(mention, confidence) else {
            tracing::debug!(mention = %mention, "Unparseable medication mention, skipping");
            continue;
        };
        let duplicate = parsed.iter().any(|p| {
            p.name.eq_ignore_ascii_case(&candidate.name)
                && p.dosage.eq_ignore_ascii_case(&candidate.dosage)
        });
        if !duplicate {
            parsed.push(candidate);
        }
    }
    parsed
}

fn title_case(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "500 MG" → "500mg".
fn normalize_dosage(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
