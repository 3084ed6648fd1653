//! Record cleaning stages.
//!
//! Pipeline: Normalization → Validation → Reconciliation

mod normalizer;
mod reconciler;
mod validator;

pub use normalizer::*;
pub use reconciler::*;
pub use validator::*;

use serde::Serialize;
use tracing::info;

use crate::config::ValidationConfig;
use crate::models::{PatientRecord, RawRecord};

/// Counters collected across the cleaning stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    /// Non-empty cells that could not be parsed
    pub parse_failures: ParseFailures,
    /// Validator drops and repairs
    pub validation: ValidationStats,
    /// Admitted records whose derived rate is null
    pub undefined_fixed_rate: usize,
}

/// Cleaned records with their stage counters.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub records: Vec<PatientRecord>,
    pub stats: CleanStats,
}

/// Coordinates the in-memory cleaning stages. No I/O happens here.
pub struct Cleaner {
    normalizer: Normalizer,
    validator: Validator,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

impl Cleaner {
    /// Create a cleaner with default synonym tables and the given policies.
    pub fn new(config: &ValidationConfig) -> Self {
        Self::with_normalizer(Normalizer::new(), config)
    }

    /// Create a cleaner around a customized normalizer.
    pub fn with_normalizer(normalizer: Normalizer, config: &ValidationConfig) -> Self {
        Self {
            normalizer,
            validator: Validator::new(config),
        }
    }

    /// Run normalization, validation and reconciliation over raw records.
    pub fn clean(&self, raw: &[RawRecord]) -> CleanOutcome {
        // Step 1: Normalize every record
        let (normalized, parse_failures) = self.normalizer.normalize_all(raw);
        info!(
            records = normalized.len(),
            parse_failures = parse_failures.total(),
            "Normalization complete"
        );

        // Step 2: Drop inadmissible records and repair counts
        let Validated {
            mut records,
            stats: validation,
        } = self.validator.validate(normalized);

        // Step 3: Derive the corrected rate
        let undefined_fixed_rate = reconcile(&mut records);

        CleanOutcome {
            records,
            stats: CleanStats {
                parse_failures,
                validation,
                undefined_fixed_rate,
            },
        }
    }

    /// Get the normalizer for direct access.
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Get the validator for direct access.
    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicatePolicy;
    use crate::models::Field;

    fn raw(row: usize, id: &str, age: &str, assigned: &str, attended: &str) -> RawRecord {
        RawRecord::new(row)
            .with(Field::PatientId, id)
            .with(Field::Age, age)
            .with(Field::TotalSessionsAssigned, assigned)
            .with(Field::SessionsAttended, attended)
    }

    #[test]
    fn test_clean_end_to_end() {
        let cleaner = Cleaner::default();
        let outcome = cleaner.clean(&[
            raw(1, "A", "30", "10", "15"),
            raw(2, "B", "", "10", "5"),
            raw(3, "C", "41", "4", "2"),
        ]);

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].sessions_attended, Some(10));
        assert_eq!(outcome.records[0].attendance_rate_fixed, Some(1.0));
        assert_eq!(outcome.records[1].attendance_rate_fixed, Some(0.5));
        assert_eq!(outcome.stats.validation.clamped, 1);
        assert_eq!(outcome.stats.validation.dropped_missing_required, 1);
        assert_eq!(outcome.stats.undefined_fixed_rate, 0);
    }

    #[test]
    fn test_unparseable_count_is_dropped() {
        let outcome = Cleaner::default().clean(&[raw(1, "A", "thirty", "10", "5")]);

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.stats.parse_failures.age, 1);
        assert_eq!(outcome.stats.validation.missing.age, 1);
    }

    #[test]
    fn test_zero_assigned_counts_as_undefined_rate() {
        let outcome = Cleaner::default().clean(&[raw(1, "A", "30", "0", "0")]);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].attendance_rate_fixed, None);
        assert_eq!(outcome.stats.undefined_fixed_rate, 1);
    }

    #[test]
    fn test_padded_ids_are_duplicates() {
        let cleaner = Cleaner::new(&ValidationConfig {
            duplicates: DuplicatePolicy::KeepFirst,
            ..Default::default()
        });
        let outcome = cleaner.clean(&[raw(1, "P001", "30", "5", "5"), raw(2, " P001 ", "31", "5", "4")]);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].patient_id.as_deref(), Some("P001"));
        assert_eq!(outcome.records[0].age, Some(30));
        assert_eq!(outcome.stats.validation.dropped_duplicates, 1);
    }
}
