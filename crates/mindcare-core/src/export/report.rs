//! Cleaning summary report.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::cleaner::CleanStats;
use crate::models::PatientRecord;

use super::writer::ArtifactInfo;

/// Report format version.
pub const REPORT_FORMAT_VERSION: &str = "1";

/// Number of records carrying one Case_Status value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

/// Headline statistics over a cleaned record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    /// Records in the set
    pub total_patients: usize,
    /// Mean Age over records with an age
    pub mean_age: Option<f64>,
    /// Mean Attendance_Rate_Fixed over records with a derived rate
    pub mean_attendance_rate_fixed: Option<f64>,
    /// Case_Status distribution, most frequent first, ties by name
    pub case_status: Vec<StatusCount>,
}

impl SummaryStats {
    /// Compute statistics over records.
    pub fn from_records(records: &[PatientRecord]) -> Self {
        Self {
            total_patients: records.len(),
            mean_age: mean(records.iter().filter_map(|r| r.age.map(f64::from))),
            mean_attendance_rate_fixed: mean(records.iter().filter_map(|r| r.attendance_rate_fixed)),
            case_status: status_distribution(records),
        }
    }
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Patients: {}", self.total_patients)?;
        match self.mean_age {
            Some(age) => writeln!(f, "Avg Age: {:.1}", age)?,
            None => writeln!(f, "Avg Age: n/a")?,
        }
        match self.mean_attendance_rate_fixed {
            Some(rate) => writeln!(f, "Avg Attendance: {:.1}%", rate * 100.0)?,
            None => writeln!(f, "Avg Attendance: n/a")?,
        }
        let statuses: Vec<String> = self
            .case_status
            .iter()
            .map(|s| format!("{}={}", s.status, s.count))
            .collect();
        write!(f, "Case Status: {{{}}}", statuses.join(", "))
    }
}

/// Full report for one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    /// Report format version
    pub format_version: String,
    /// Unique run ID
    pub run_id: String,
    /// Report timestamp
    pub generated_at: String,
    /// Raw source path
    pub source: String,
    /// Columns found in the source header
    pub source_columns: usize,
    /// Written artifact
    pub artifact: ArtifactInfo,
    /// Stage counters
    pub stats: CleanStats,
    /// Headline statistics of the written records
    pub summary: SummaryStats,
}

impl CleaningReport {
    /// Build a report for a finished run.
    pub fn new(
        source: String,
        source_columns: usize,
        artifact: ArtifactInfo,
        stats: CleanStats,
        records: &[PatientRecord],
    ) -> Self {
        Self {
            format_version: REPORT_FORMAT_VERSION.to_string(),
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            source,
            source_columns,
            artifact,
            stats,
            summary: SummaryStats::from_records(records),
        }
    }

    /// Rows entering validation.
    pub fn rows_before(&self) -> usize {
        self.stats.validation.rows_before
    }

    /// Rows written.
    pub fn rows_after(&self) -> usize {
        self.stats.validation.rows_after
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for CleaningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let validation = &self.stats.validation;
        writeln!(f, "CLEANING SUMMARY:")?;
        writeln!(f, "Rows before: {}, after: {}", self.rows_before(), self.rows_after())?;
        writeln!(
            f,
            "Missing Age: {}, Sessions Assigned: {}, Sessions Attended: {}",
            validation.missing.age,
            validation.missing.total_sessions_assigned,
            validation.missing.sessions_attended
        )?;
        writeln!(
            f,
            "Clamped: {}, Zero assigned: {}, Duplicates dropped: {}, Unparseable cells: {}",
            validation.clamped,
            validation.zero_assigned,
            validation.dropped_duplicates,
            self.stats.parse_failures.total()
        )?;
        writeln!(f)?;
        writeln!(f, "CLEAN DATA SAVED: {}", self.artifact.path.display())?;
        writeln!(f, "SHA-256: {}", self.artifact.sha256)?;
        writeln!(f)?;
        writeln!(f, "CLEAN DATA STATS:")?;
        write!(f, "{}", self.summary)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn status_distribution(records: &[PatientRecord]) -> Vec<StatusCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for status in records.iter().filter_map(|r| r.case_status.as_deref()) {
        *counts.entry(status).or_default() += 1;
    }

    let mut distribution: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.to_string(),
            count,
        })
        .collect();
    distribution.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
    distribution
}
