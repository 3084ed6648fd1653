//! Per-field normalizer for raw patient records.
//!
//! Handles:
//! - Percentage parsing (`"85%"` → 0.85)
//! - Category canonicalization (trim, title-case, synonym table)
//! - Permissive date parsing
//! - Count and score parsing
//!
//! Every rule is total: malformed input becomes `None`, never an error.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{Field, PatientRecord, RawRecord};

/// Date-only layouts, tried in order. Month-first precedes day-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d-%b-%Y",
];

/// Date-time layouts; only the date part is kept.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Explicit mapping from noisy category values to canonical ones.
///
/// Keys and values are stored title-cased; lookups of unmapped values
/// return the input unchanged.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: HashMap<String, String>,
}

impl SynonymTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping. Both sides are trimmed and title-cased.
    pub fn insert(&mut self, raw: &str, canonical: &str) {
        self.entries
            .insert(title_case(raw.trim()), title_case(canonical.trim()));
    }

    /// Canonical form of an already title-cased value.
    pub fn lookup<'a>(&'a self, value: &'a str) -> &'a str {
        self.entries.get(value).map(String::as_str).unwrap_or(value)
    }

    /// Canonical values this table can produce.
    pub fn canonical_values(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for SynonymTable {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut table = Self::new();
        for (raw, canonical) in pairs {
            table.insert(raw, canonical);
        }
        table
    }
}

/// Non-empty cells that failed to parse, per field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseFailures {
    pub age: usize,
    pub registration_date: usize,
    pub total_sessions_assigned: usize,
    pub sessions_attended: usize,
    pub attendance_rate: usize,
    pub satisfaction_score: usize,
}

impl ParseFailures {
    /// Total failures across all fields.
    pub fn total(&self) -> usize {
        self.age
            + self.registration_date
            + self.total_sessions_assigned
            + self.sessions_attended
            + self.attendance_rate
            + self.satisfaction_score
    }

    fn record(&mut self, raw: &RawRecord, normalized: &PatientRecord) {
        let failed = |field: Field, parsed: bool| usize::from(raw.get(field).is_some() && !parsed);

        self.age += failed(Field::Age, normalized.age.is_some());
        self.registration_date += failed(
            Field::RegistrationDate,
            normalized.registration_date.is_some(),
        );
        self.total_sessions_assigned += failed(
            Field::TotalSessionsAssigned,
            normalized.total_sessions_assigned.is_some(),
        );
        self.sessions_attended += failed(
            Field::SessionsAttended,
            normalized.sessions_attended.is_some(),
        );
        self.attendance_rate += failed(Field::AttendanceRate, normalized.attendance_rate.is_some());
        self.satisfaction_score += failed(
            Field::SatisfactionScore,
            normalized.satisfaction_score.is_some(),
        );
    }
}

/// Normalizer for raw patient records.
pub struct Normalizer {
    /// Case_Status synonyms: title-cased raw → canonical
    status_synonyms: SynonymTable,
    /// Gender synonyms: title-cased raw → canonical
    gender_synonyms: SynonymTable,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Create a new normalizer with default mappings.
    pub fn new() -> Self {
        Self {
            status_synonyms: Self::default_status_synonyms(),
            gender_synonyms: Self::default_gender_synonyms(),
        }
    }

    /// Normalize one raw record. Attendance_Rate_Fixed is left unset.
    pub fn normalize(&self, raw: &RawRecord) -> PatientRecord {
        PatientRecord {
            patient_id: passthrough(raw.get(Field::PatientId)),
            patient_name: passthrough(raw.get(Field::PatientName)),
            age: raw.get(Field::Age).and_then(parse_count),
            gender: raw.get(Field::Gender).and_then(|g| self.canonical_gender(g)),
            city: raw.get(Field::City).and_then(canonical_city),
            registration_date: raw.get(Field::RegistrationDate).and_then(parse_date),
            program_type: passthrough(raw.get(Field::ProgramType)),
            therapy_type: passthrough(raw.get(Field::TherapyType)),
            total_sessions_assigned: raw.get(Field::TotalSessionsAssigned).and_then(parse_count),
            sessions_attended: raw.get(Field::SessionsAttended).and_then(parse_count),
            attendance_rate: raw.get(Field::AttendanceRate).and_then(parse_percentage),
            provider_name: passthrough(raw.get(Field::ProviderName)),
            case_status: raw.get(Field::CaseStatus).and_then(|s| self.canonical_status(s)),
            risk_level: passthrough(raw.get(Field::RiskLevel)),
            satisfaction_score: raw.get(Field::SatisfactionScore).and_then(parse_decimal),
            attendance_rate_fixed: None,
        }
    }

    /// Normalize every record, tallying cells that failed to parse.
    pub fn normalize_all(&self, records: &[RawRecord]) -> (Vec<PatientRecord>, ParseFailures) {
        let mut failures = ParseFailures::default();
        let normalized = records
            .iter()
            .map(|raw| {
                let record = self.normalize(raw);
                failures.record(raw, &record);
                record
            })
            .collect();
        (normalized, failures)
    }

    /// Trim, title-case and map a Case_Status value.
    pub fn canonical_status(&self, value: &str) -> Option<String> {
        canonical_category(value, &self.status_synonyms)
    }

    /// Trim, title-case and map a Gender value.
    pub fn canonical_gender(&self, value: &str) -> Option<String> {
        canonical_category(value, &self.gender_synonyms)
    }

    /// Add a custom Case_Status synonym.
    pub fn add_status_synonym(&mut self, raw: &str, canonical: &str) {
        self.status_synonyms.insert(raw, canonical);
    }

    /// Add a custom Gender synonym.
    pub fn add_gender_synonym(&mut self, raw: &str, canonical: &str) {
        self.gender_synonyms.insert(raw, canonical);
    }

    pub fn status_synonyms(&self) -> &SynonymTable {
        &self.status_synonyms
    }

    pub fn gender_synonyms(&self) -> &SynonymTable {
        &self.gender_synonyms
    }

    /// Default Case_Status synonyms.
    fn default_status_synonyms() -> SynonymTable {
        SynonymTable::from([("Inprogress", "In Progress"), ("Activecase", "Active")])
    }

    /// Default Gender synonyms.
    fn default_gender_synonyms() -> SynonymTable {
        SynonymTable::from([("Othergender", "Other"), ("F", "Female"), ("M", "Male")])
    }
}

fn canonical_category(value: &str, synonyms: &SynonymTable) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let titled = title_case(trimmed);
    Some(synonyms.lookup(&titled).to_string())
}

fn passthrough(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Trim and title-case a city name. Blank → `None`.
pub fn canonical_city(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(title_case(trimmed))
    }
}

/// Title-case text: a cased letter that follows an uncased character is
/// upper-cased, every other cased letter is lower-cased. Digits,
/// punctuation and uncased scripts such as CJK all end a word.
///
/// Characters whose case mapping expands to several characters are kept
/// as they are so the result is stable under repeated application.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_word = false;

    for c in value.chars() {
        let cased = c.is_uppercase() || c.is_lowercase();
        if cased {
            let mapped = if in_word {
                single_char(c.to_lowercase())
            } else {
                single_char(c.to_uppercase())
            };
            out.push(mapped.unwrap_or(c));
        } else {
            out.push(c);
        }
        in_word = cased;
    }

    out
}

fn single_char(mut mapping: impl Iterator<Item = char>) -> Option<char> {
    match (mapping.next(), mapping.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Parse a finite decimal number.
pub fn parse_decimal(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse a percentage into a fraction: `"85%"` → 0.85, `" 100 % "` → 1.0.
///
/// Every percent sign is removed before parsing, wherever it appears.
pub fn parse_percentage(value: &str) -> Option<f64> {
    let number: String = value.chars().filter(|&c| c != '%').collect();
    parse_decimal(&number).map(|v| v / 100.0)
}

/// Parse a non-negative whole count. `"12"` and `"12.0"` are accepted;
/// fractional, negative or out-of-range values are `None`.
pub fn parse_count(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return Some(n);
    }
    parse_decimal(trimmed)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v as u32)
}

/// Best-effort calendar date parsing. Unparseable → `None`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}
