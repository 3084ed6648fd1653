//! End-to-end pipeline tests against temporary directories.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use mindcare_core::config::{DuplicatePolicy, PipelineConfig, SchemaCheck, ZeroSessionPolicy};
use mindcare_core::export::{hash_data, WriteError};
use mindcare_core::loader::LoadError;
use mindcare_core::{run, CleanDataset, PipelineError};

const HEADER: &str = "Patient_ID,Patient_Name,Age,Gender,City,Registration_Date,Program_Type,\
Therapy_Type,Total_Sessions_Assigned,Sessions_Attended,Attendance_Rate,Provider_Name,Case_Status,\
Risk_Level,Satisfaction_Score";

/// Five rows: one clean, one malformed percentage, one synonym status,
/// one over-attendance and one missing age.
const BATCH: &[&str] = &[
    "P001,Alice Smith,34,f, new york ,2023-01-05,Outpatient,CBT,10,8,80%,Dr. Lee,active,Low,4.5",
    "P002,Bob Jones,45,M,chicago,02/14/2023,Inpatient,DBT,12,6,n/a,Dr. Kim,completed,Medium,3.8",
    "P003,Cara White,29,othergender,boston,2023-03-10,Outpatient,Group,8,4,50%,Dr. Lee,inprogress,High,4.0",
    "P004,Dan Brown,52,male,seattle,2023-04-01,Outpatient,CBT,10,15,150%,Dr. Park,ACTIVECASE,Low,2.9",
    "P005,Eve Black,,F,denver,2023-05-20,Inpatient,DBT,6,3,50%,Dr. Kim,Completed,Medium,4.2",
];

fn write_source(dir: &Path, header: &str, rows: &[&str]) -> std::path::PathBuf {
    let path = dir.join("RawData/patients.csv");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    fs::write(&path, text).unwrap();
    path
}

fn config_for(dir: &Path, source: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::with_paths(source, dir.join("CleanedData/patients_master_clean.csv"));
    config.output.report = Some(dir.join("CleanedData/cleaning_report.json"));
    config
}

#[test]
fn test_five_row_batch() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), HEADER, BATCH);
    let config = config_for(dir.path(), &source);

    let report = run(&config).unwrap();

    assert_eq!(report.rows_before(), 5);
    assert_eq!(report.rows_after(), 4);
    assert_eq!(report.stats.validation.missing.age, 1);
    assert_eq!(report.stats.validation.clamped, 1);
    assert_eq!(report.stats.parse_failures.attendance_rate, 1);

    let text = fs::read_to_string(&config.output.artifact).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5); // Header + 4 rows
    assert_eq!(lines[0], format!("{},Attendance_Rate_Fixed", HEADER));
    assert_eq!(
        lines[1],
        "P001,Alice Smith,34,Female,New York,2023-01-05,Outpatient,CBT,10,8,0.8,Dr. Lee,Active,Low,4.5,0.8"
    );
    assert_eq!(
        lines[2],
        "P002,Bob Jones,45,Male,Chicago,2023-02-14,Inpatient,DBT,12,6,,Dr. Kim,Completed,Medium,3.8,0.5"
    );
    assert_eq!(
        lines[3],
        "P003,Cara White,29,Other,Boston,2023-03-10,Outpatient,Group,8,4,0.5,Dr. Lee,In Progress,High,4.0,0.5"
    );
    assert_eq!(
        lines[4],
        "P004,Dan Brown,52,Male,Seattle,2023-04-01,Outpatient,CBT,10,10,1.5,Dr. Park,Active,Low,2.9,1.0"
    );
    assert!(!text.contains("P005"));
}

#[test]
fn test_artifact_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), HEADER, BATCH);
    let config = config_for(dir.path(), &source);
    run(&config).unwrap();

    let dataset = CleanDataset::read_path(&config.output.artifact).unwrap();

    assert!(!dataset.recomputed_fixed_rate);
    assert_eq!(dataset.records.len(), 4);
    let over = &dataset.records[3];
    assert_eq!(over.sessions_attended, Some(10));
    assert_eq!(over.attendance_rate_fixed, Some(1.0));
    assert_eq!(dataset.records[1].registration_date, NaiveDate::from_ymd_opt(2023, 2, 14));
    assert_eq!(dataset.records[1].attendance_rate, None);

    for record in &dataset.records {
        let attended = record.sessions_attended.unwrap();
        let assigned = record.total_sessions_assigned.unwrap();
        assert!(attended <= assigned);
        assert_eq!(record.attendance_rate_fixed, Some(attended as f64 / assigned as f64));
    }
}

#[test]
fn test_report_written() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), HEADER, BATCH);
    let config = config_for(dir.path(), &source);

    let report = run(&config).unwrap();

    let summary = &report.summary;
    assert_eq!(summary.total_patients, 4);
    assert_eq!(summary.mean_age, Some(40.0));
    assert!((summary.mean_attendance_rate_fixed.unwrap() - 0.7).abs() < 1e-12);
    assert_eq!(summary.case_status[0].status, "Active");
    assert_eq!(summary.case_status[0].count, 2);

    let artifact_bytes = fs::read(&config.output.artifact).unwrap();
    assert_eq!(report.artifact.sha256, hash_data(&artifact_bytes));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.output.report.as_ref().unwrap()).unwrap())
            .unwrap();
    assert_eq!(json["run_id"], report.run_id.as_str());
    assert_eq!(json["stats"]["validation"]["rows_after"], 4);
    assert_eq!(json["summary"]["total_patients"], 4);
}

#[test]
fn test_drop_scenario_keeps_rest_of_batch() {
    let dir = tempfile::tempdir().unwrap();
    let rows = [
        "A1,,31,F,x,,,,5,5,100%,,Active,,",
        "A2,,,F,x,,,,5,5,100%,,Active,,",
        "A3,,33,F,x,,,,5,4,80%,,Active,,",
    ];
    let source = write_source(dir.path(), HEADER, &rows);
    let config = config_for(dir.path(), &source);
    run(&config).unwrap();

    let dataset = CleanDataset::read_path(&config.output.artifact).unwrap();
    let ids: Vec<_> = dataset
        .records
        .iter()
        .map(|r| r.patient_id.clone().unwrap())
        .collect();
    assert_eq!(ids, vec!["A1", "A3"]);
}

#[test]
fn test_zero_assigned_policies() {
    let dir = tempfile::tempdir().unwrap();
    let rows = ["Z1,,40,M,x,,,,0,0,0%,,Active,,", "Z2,,41,M,x,,,,4,2,50%,,Active,,"];
    let source = write_source(dir.path(), HEADER, &rows);

    // Default: admitted with a null derived rate
    let config = config_for(dir.path(), &source);
    let report = run(&config).unwrap();
    assert_eq!(report.rows_after(), 2);
    assert_eq!(report.stats.undefined_fixed_rate, 1);
    let dataset = CleanDataset::read_path(&config.output.artifact).unwrap();
    assert_eq!(dataset.records[0].attendance_rate_fixed, None);

    // Drop policy: treated as inadmissible
    let mut config = config_for(dir.path(), &source);
    config.validation.zero_sessions = ZeroSessionPolicy::Drop;
    let report = run(&config).unwrap();
    assert_eq!(report.rows_after(), 1);
    assert_eq!(report.stats.validation.dropped_zero_assigned, 1);
}

#[test]
fn test_positional_mapping_ignores_header_names() {
    let dir = tempfile::tempdir().unwrap();
    let header = (1..=15).map(|i| format!("Column {}", i)).collect::<Vec<_>>().join(",");
    let source = write_source(dir.path(), &header, BATCH);
    let config = config_for(dir.path(), &source);

    let report = run(&config).unwrap();
    assert_eq!(report.rows_after(), 4);
}

#[test]
fn test_strict_schema_fails_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let header = HEADER.replace("Age,Gender", "Gender,Age");
    let source = write_source(dir.path(), &header, BATCH);
    let mut config = config_for(dir.path(), &source);
    config.loader.schema_check = SchemaCheck::Strict;

    let err = run(&config).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Load(LoadError::SchemaMismatch { position: 3, .. })
    ));
    assert!(!config.output.artifact.exists());
    assert!(!config.output.report.as_ref().unwrap().exists());
}

#[test]
fn test_missing_source_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &dir.path().join("missing.csv"));

    let err = run(&config).unwrap_err();

    assert!(matches!(err, PipelineError::Load(LoadError::Open { .. })));
    assert!(!config.output.artifact.exists());
}

#[test]
fn test_report_failure_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), HEADER, BATCH);
    let config = config_for(dir.path(), &source);
    let out_dir = dir.path().join("CleanedData");
    fs::create_dir_all(&out_dir).unwrap();
    fs::write(&config.output.artifact, "previous run\n").unwrap();
    // Report destination is an existing directory, so its rename fails
    fs::create_dir(config.output.report.as_ref().unwrap()).unwrap();

    let err = run(&config).unwrap_err();

    assert!(matches!(err, PipelineError::Write(WriteError::Io { .. })));
    assert_eq!(
        fs::read_to_string(&config.output.artifact).unwrap(),
        "previous run\n"
    );
    // Only the old artifact and the blocking directory remain
    assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 2);
}

#[test]
fn test_padded_ids_deduplicate() {
    let dir = tempfile::tempdir().unwrap();
    let rows = [
        "P001,Ann,30,F,x,,,,5,5,100%,,Active,,",
        " P001 ,Ann,30,F,x,,,,5,4,80%,,Active,,",
    ];
    let source = write_source(dir.path(), HEADER, &rows);
    let mut config = config_for(dir.path(), &source);
    config.validation.duplicates = DuplicatePolicy::KeepFirst;

    let report = run(&config).unwrap();

    assert_eq!(report.rows_after(), 1);
    assert_eq!(report.stats.validation.dropped_duplicates, 1);
    let text = fs::read_to_string(&config.output.artifact).unwrap();
    assert!(!text.contains(" P001"));
}
