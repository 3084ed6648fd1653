//! Reader for cleaned artifacts, as consumed by the dashboards.
//!
//! Columns are matched by header name, so column order does not matter.
//! Dates and rates are parsed leniently. When Attendance_Rate_Fixed is
//! absent it is recomputed from the session counts.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;
use tracing::{info, warn};

use crate::cleaner::{parse_count, parse_date, parse_decimal};
use crate::models::{Field, PatientRecord};

use super::report::SummaryStats;

/// Columns needed to recompute a missing Attendance_Rate_Fixed.
const RATE_INPUTS: [Field; 2] = [Field::TotalSessionsAssigned, Field::SessionsAttended];

/// Dataset reader errors.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Cannot open dataset '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset has no Attendance_Rate_Fixed and is missing '{0}' to recompute it")]
    MissingColumn(Field),
}

pub type DatasetResult<T> = Result<T, DatasetError>;

/// A cleaned record set loaded back from disk.
#[derive(Debug, Clone, Default)]
pub struct CleanDataset {
    pub records: Vec<PatientRecord>,
    /// Attendance_Rate_Fixed was absent and has been recomputed
    pub recomputed_fixed_rate: bool,
    /// Header names not recognized as canonical fields
    pub unknown_columns: Vec<String>,
}

impl CleanDataset {
    /// Read a cleaned artifact from `path`.
    pub fn read_path<P: AsRef<Path>>(path: P) -> DatasetResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::read_reader(file)?;
        info!(
            path = %path.display(),
            records = dataset.records.len(),
            recomputed = dataset.recomputed_fixed_rate,
            "Clean dataset loaded"
        );
        Ok(dataset)
    }

    /// Read a cleaned artifact from any reader.
    pub fn read_reader<R: Read>(reader: R) -> DatasetResult<Self> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

        let mut columns: HashMap<Field, usize> = HashMap::new();
        let mut unknown_columns = Vec::new();
        for (i, header) in rdr.headers()?.iter().enumerate() {
            match Field::from_header(header) {
                Some(field) => {
                    columns.entry(field).or_insert(i);
                }
                None => unknown_columns.push(header.to_string()),
            }
        }

        let recompute = !columns.contains_key(&Field::AttendanceRateFixed);
        if recompute {
            if let Some(missing) = RATE_INPUTS.iter().find(|f| !columns.contains_key(*f)) {
                return Err(DatasetError::MissingColumn(*missing));
            }
        }
        if !unknown_columns.is_empty() {
            warn!(columns = ?unknown_columns, "Ignoring unrecognized columns");
        }

        let mut records = Vec::new();
        let mut row = StringRecord::new();
        while rdr.read_record(&mut row)? {
            let mut record = parse_row(&row, &columns);
            if recompute {
                record.attendance_rate_fixed = record.computed_attendance_rate();
            }
            records.push(record);
        }

        Ok(Self {
            records,
            recomputed_fixed_rate: recompute,
            unknown_columns,
        })
    }

    /// Headline statistics over the loaded records.
    pub fn summary(&self) -> SummaryStats {
        SummaryStats::from_records(&self.records)
    }
}

fn parse_row(row: &StringRecord, columns: &HashMap<Field, usize>) -> PatientRecord {
    let cell = |field: Field| {
        columns
            .get(&field)
            .and_then(|&i| row.get(i))
            .filter(|s| !s.trim().is_empty())
    };
    let text = |field: Field| cell(field).map(str::to_string);

    PatientRecord {
        patient_id: text(Field::PatientId),
        patient_name: text(Field::PatientName),
        age: cell(Field::Age).and_then(parse_count),
        gender: text(Field::Gender),
        city: text(Field::City),
        registration_date: cell(Field::RegistrationDate).and_then(parse_date),
        program_type: text(Field::ProgramType),
        therapy_type: text(Field::TherapyType),
        total_sessions_assigned: cell(Field::TotalSessionsAssigned).and_then(parse_count),
        sessions_attended: cell(Field::SessionsAttended).and_then(parse_count),
        attendance_rate: cell(Field::AttendanceRate).and_then(parse_decimal),
        provider_name: text(Field::ProviderName),
        case_status: text(Field::CaseStatus),
        risk_level: text(Field::RiskLevel),
        satisfaction_score: cell(Field::SatisfactionScore).and_then(parse_decimal),
        attendance_rate_fixed: cell(Field::AttendanceRateFixed).and_then(parse_decimal),
    }
}
