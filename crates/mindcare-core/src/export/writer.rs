//! Cleaned artifact writer.
//!
//! Output is written to a temporary file beside the destination and renamed
//! into place, so readers never see a partial artifact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::models::{Field, PatientRecord};

/// Writer errors. All of them abort the run.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Cannot create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type WriteResult<T> = Result<T, WriteError>;

/// Facts about a written artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    /// Final artifact path
    pub path: PathBuf,
    /// Data rows written (header excluded)
    pub rows: usize,
    /// Artifact size in bytes
    pub bytes: u64,
    /// SHA-256 of the artifact contents, hex-encoded
    pub sha256: String,
}

/// Encode records as CSV: canonical header row, then one row per record.
///
/// Nulls are empty cells and dates are `YYYY-MM-DD`.
pub fn encode_csv(records: &[PatientRecord]) -> WriteResult<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(Field::OUTPUT.iter().map(Field::as_str))?;
    for record in records {
        wtr.serialize(record)?;
    }

    wtr.into_inner().map_err(|e| WriteError::Io {
        path: PathBuf::from("<memory>"),
        source: e.into_error(),
    })
}

impl ArtifactInfo {
    /// Describe encoded artifact bytes destined for `path`.
    pub fn describe(path: &Path, rows: usize, bytes: &[u8]) -> Self {
        Self {
            path: path.to_path_buf(),
            rows,
            bytes: bytes.len() as u64,
            sha256: hash_data(bytes),
        }
    }
}

/// Encode any serializable value as pretty JSON with a trailing newline.
pub fn encode_json<T: Serialize>(value: &T) -> WriteResult<Vec<u8>> {
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    Ok(json)
}

/// Write the cleaned records to `path`, creating missing directories.
pub fn write_csv<P: AsRef<Path>>(path: P, records: &[PatientRecord]) -> WriteResult<ArtifactInfo> {
    let path = path.as_ref();
    let bytes = encode_csv(records)?;
    write_atomic(path, &bytes)?;

    let info = ArtifactInfo::describe(path, records.len(), &bytes);
    info!(
        path = %path.display(),
        rows = info.rows,
        sha256 = %info.sha256,
        "Clean data saved"
    );
    Ok(info)
}

/// Write `bytes` to a temporary file in the destination directory, then
/// rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> WriteResult<()> {
    StagedFile::stage(path, bytes)?.publish()
}

/// Fully written and synced contents waiting to be renamed over their
/// destination. Dropping it unpublished removes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    /// Write `bytes` to a temporary file beside `path`, creating missing
    /// directories. The destination is not touched.
    pub fn stage(path: &Path, bytes: &[u8]) -> WriteResult<Self> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| WriteError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let io_err = |source: std::io::Error| WriteError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        Ok(Self {
            tmp,
            path: path.to_path_buf(),
        })
    }

    /// Rename the temporary file over the destination.
    pub fn publish(self) -> WriteResult<()> {
        let Self { tmp, path } = self;
        tmp.persist(&path).map_err(|e| WriteError::Io {
            path,
            source: e.error,
        })?;
        Ok(())
    }
}

/// Hex-encoded SHA-256 of some bytes.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
