//! Admissibility checks over normalized records.
//!
//! Policies, applied in order:
//! 1. Drop records missing Age, Total_Sessions_Assigned or Sessions_Attended
//! 2. Apply the zero-assigned policy
//! 3. Clamp Sessions_Attended down to Total_Sessions_Assigned
//! 4. Apply the duplicate Patient_ID policy
//!
//! Survivors keep their input order.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{DuplicatePolicy, ValidationConfig, ZeroSessionPolicy};
use crate::models::PatientRecord;

/// Null counts for the required fields, taken before any record is dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MissingCounts {
    pub age: usize,
    pub total_sessions_assigned: usize,
    pub sessions_attended: usize,
}

/// What the validator did to the record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    /// Records entering the validator
    pub rows_before: usize,
    /// Records admitted
    pub rows_after: usize,
    /// Per-field nulls among the incoming records
    pub missing: MissingCounts,
    /// Dropped for a missing required field
    pub dropped_missing_required: usize,
    /// Admitted records with zero sessions assigned (kept or dropped per policy)
    pub zero_assigned: usize,
    /// Dropped under [`ZeroSessionPolicy::Drop`]
    pub dropped_zero_assigned: usize,
    /// Sessions_Attended clamped to Total_Sessions_Assigned
    pub clamped: usize,
    /// Dropped as duplicate Patient_IDs
    pub dropped_duplicates: usize,
}

impl ValidationStats {
    /// Total records removed.
    pub fn dropped(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

/// Validator output.
#[derive(Debug, Clone)]
pub struct Validated {
    pub records: Vec<PatientRecord>,
    pub stats: ValidationStats,
}

/// Record admissibility validator.
pub struct Validator {
    zero_sessions: ZeroSessionPolicy,
    duplicates: DuplicatePolicy,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

impl Validator {
    /// Create a validator with the given policies.
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            zero_sessions: config.zero_sessions,
            duplicates: config.duplicates,
        }
    }

    /// Filter and repair normalized records.
    pub fn validate(&self, records: Vec<PatientRecord>) -> Validated {
        let mut stats = ValidationStats {
            rows_before: records.len(),
            missing: count_missing(&records),
            ..Default::default()
        };

        let mut admitted = Vec::with_capacity(records.len());
        for mut record in records {
            if !record.is_admissible() {
                stats.dropped_missing_required += 1;
                continue;
            }

            if record.total_sessions_assigned == Some(0) {
                stats.zero_assigned += 1;
                if self.zero_sessions == ZeroSessionPolicy::Drop {
                    stats.dropped_zero_assigned += 1;
                    continue;
                }
            }

            if clamp_attendance(&mut record) {
                stats.clamped += 1;
            }

            admitted.push(record);
        }

        let (admitted, dropped_duplicates) = self.apply_duplicate_policy(admitted);
        stats.dropped_duplicates = dropped_duplicates;
        stats.rows_after = admitted.len();

        info!(
            before = stats.rows_before,
            after = stats.rows_after,
            missing_age = stats.missing.age,
            missing_assigned = stats.missing.total_sessions_assigned,
            missing_attended = stats.missing.sessions_attended,
            "Validation complete"
        );
        debug!(
            clamped = stats.clamped,
            zero_assigned = stats.zero_assigned,
            duplicates = stats.dropped_duplicates,
            "Validation repairs"
        );

        Validated {
            records: admitted,
            stats,
        }
    }

    fn apply_duplicate_policy(&self, records: Vec<PatientRecord>) -> (Vec<PatientRecord>, usize) {
        let before = records.len();
        let kept = match self.duplicates {
            DuplicatePolicy::KeepAll => {
                let repeated = repeated_ids(&records);
                if repeated > 0 {
                    warn!(repeated, "Patient_ID values repeat; keeping all records");
                }
                records
            }
            DuplicatePolicy::KeepFirst => {
                let mut seen = HashSet::new();
                records
                    .into_iter()
                    .filter(|r| match &r.patient_id {
                        Some(id) => seen.insert(id.clone()),
                        None => true,
                    })
                    .collect()
            }
            DuplicatePolicy::KeepLast => {
                let last: HashMap<&str, usize> = records
                    .iter()
                    .enumerate()
                    .filter_map(|(i, r)| r.patient_id.as_deref().map(|id| (id, i)))
                    .collect();
                let keep: Vec<bool> = records
                    .iter()
                    .enumerate()
                    .map(|(i, r)| match r.patient_id.as_deref() {
                        Some(id) => last.get(id) == Some(&i),
                        None => true,
                    })
                    .collect();
                records
                    .into_iter()
                    .zip(keep)
                    .filter_map(|(r, k)| k.then_some(r))
                    .collect()
            }
        };
        let dropped = before - kept.len();
        (kept, dropped)
    }
}

/// Clamp attended sessions to the assigned count. Returns whether it changed.
pub fn clamp_attendance(record: &mut PatientRecord) -> bool {
    match (record.sessions_attended, record.total_sessions_assigned) {
        (Some(attended), Some(assigned)) if attended > assigned => {
            record.sessions_attended = Some(assigned);
            true
        }
        _ => false,
    }
}

fn count_missing(records: &[PatientRecord]) -> MissingCounts {
    records.iter().fold(MissingCounts::default(), |mut acc, r| {
        acc.age += usize::from(r.age.is_none());
        acc.total_sessions_assigned += usize::from(r.total_sessions_assigned.is_none());
        acc.sessions_attended += usize::from(r.sessions_attended.is_none());
        acc
    })
}

fn repeated_ids(records: &[PatientRecord]) -> usize {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|r| r.patient_id.as_deref())
        .filter(|id| !seen.insert(*id))
        .count()
}
