//! End-to-end pipeline run.

use std::fs;

use thiserror::Error;
use tracing::{info, warn};

use crate::cleaner::Cleaner;
use crate::config::PipelineConfig;
use crate::export::{encode_csv, encode_json, ArtifactInfo, CleaningReport, StagedFile, WriteError};
use crate::loader::{LoadError, Loader};

/// Fatal pipeline errors. Per-field and per-record problems never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Write failed: {0}")]
    Write(#[from] WriteError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Load, clean and persist according to `config`.
///
/// The artifact and report are fully encoded and staged before anything is
/// published, and the artifact is renamed into place last. Any error leaves
/// the previous artifact untouched.
pub fn run(config: &PipelineConfig) -> PipelineResult<CleaningReport> {
    run_with(&Cleaner::new(&config.validation), config)
}

/// Like [`run`], with a caller-supplied cleaner.
pub fn run_with(cleaner: &Cleaner, config: &PipelineConfig) -> PipelineResult<CleaningReport> {
    // Step 1: Load the raw source
    let loader = Loader::new(&config.loader)?;
    let table = loader.load_path(&config.loader.source)?;

    // Step 2: Normalize, validate, reconcile
    let outcome = cleaner.clean(&table.records);

    // Step 3: Encode and stage the artifact
    let artifact_path = &config.output.artifact;
    let csv = encode_csv(&outcome.records)?;
    let artifact = ArtifactInfo::describe(artifact_path, outcome.records.len(), &csv);
    let staged_artifact = StagedFile::stage(artifact_path, &csv)?;

    let report = CleaningReport::new(
        config.loader.source.display().to_string(),
        table.column_count(),
        artifact,
        outcome.stats,
        &outcome.records,
    );

    // Step 4: Publish the report, if configured
    let published_report = match &config.output.report {
        Some(path) => {
            StagedFile::stage(path, &encode_json(&report)?)?.publish()?;
            Some(path)
        }
        None => None,
    };

    // Step 5: Publish the artifact
    if let Err(err) = staged_artifact.publish() {
        if let Some(path) = published_report {
            // The report describes an artifact that was never published
            if let Err(remove_err) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %remove_err, "Could not remove orphaned report");
            }
        }
        return Err(err.into());
    }

    info!(
        path = %artifact_path.display(),
        rows = report.artifact.rows,
        sha256 = %report.artifact.sha256,
        "Clean data saved"
    );
    if let Some(path) = published_report {
        info!(path = %path.display(), "Cleaning report saved");
    }
    info!(
        run_id = %report.run_id,
        before = report.rows_before(),
        after = report.rows_after(),
        "Pipeline finished"
    );
    Ok(report)
}
