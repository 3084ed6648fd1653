//! Pipeline configuration.
//!
//! Resolution order is defaults, then an optional TOML file, then
//! `MINDCARE_*` environment variables. The CLI applies its flags last.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default raw source, relative to the working directory.
pub const DEFAULT_SOURCE: &str = "Dataset/RawData/Mental_Health_Patients_Dataset_3000.csv";
/// Default cleaned artifact.
pub const DEFAULT_ARTIFACT: &str = "Dataset/CleanedData/patients_master_clean.csv";
/// Default summary report.
pub const DEFAULT_REPORT: &str = "Dataset/CleanedData/cleaning_report.json";

pub const ENV_SOURCE: &str = "MINDCARE_SOURCE";
pub const ENV_OUTPUT: &str = "MINDCARE_OUTPUT";
pub const ENV_REPORT: &str = "MINDCARE_REPORT";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),

    #[error("Unknown {kind} policy: {value}")]
    UnknownPolicy { kind: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// How source headers are checked before the positional rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaCheck {
    /// Map by position; log mismatching header names
    #[default]
    Positional,
    /// Fail on the first header that does not match its canonical name
    Strict,
}

/// What to do with admitted records that have zero sessions assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroSessionPolicy {
    /// Keep the record; Attendance_Rate_Fixed is null
    #[default]
    NullRate,
    /// Treat the record as inadmissible
    Drop,
}

/// Handling of repeated Patient_ID values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep every record
    #[default]
    KeepAll,
    /// Keep the first record per id
    KeepFirst,
    /// Keep the last record per id
    KeepLast,
}

impl FromStr for SchemaCheck {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "positional" => Ok(Self::Positional),
            "strict" => Ok(Self::Strict),
            other => Err(ConfigError::UnknownPolicy {
                kind: "schema check",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for ZeroSessionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "null-rate" | "null_rate" => Ok(Self::NullRate),
            "drop" => Ok(Self::Drop),
            other => Err(ConfigError::UnknownPolicy {
                kind: "zero-session",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "keep-all" | "keep_all" => Ok(Self::KeepAll),
            "keep-first" | "keep_first" => Ok(Self::KeepFirst),
            "keep-last" | "keep_last" => Ok(Self::KeepLast),
            other => Err(ConfigError::UnknownPolicy {
                kind: "duplicate",
                value: other.to_string(),
            }),
        }
    }
}

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Path to the raw source
    pub source: PathBuf,
    /// Field delimiter of the source
    pub delimiter: char,
    /// Header check mode
    pub schema_check: SchemaCheck,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            delimiter: ',',
            schema_check: SchemaCheck::default(),
        }
    }
}

impl LoaderConfig {
    /// Delimiter as the byte the csv reader expects.
    pub fn delimiter_byte(&self) -> ConfigResult<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(ConfigError::InvalidDelimiter(self.delimiter))
        }
    }
}

/// Validator settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub zero_sessions: ZeroSessionPolicy,
    pub duplicates: DuplicatePolicy,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Cleaned CSV artifact
    pub artifact: PathBuf,
    /// JSON summary report; not written when unset
    pub report: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            artifact: PathBuf::from(DEFAULT_ARTIFACT),
            report: Some(PathBuf::from(DEFAULT_REPORT)),
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub loader: LoaderConfig,
    pub validation: ValidationConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Configuration reading `source` and writing to `artifact`, with no report.
    pub fn with_paths(source: impl Into<PathBuf>, artifact: impl Into<PathBuf>) -> Self {
        Self {
            loader: LoaderConfig {
                source: source.into(),
                ..Default::default()
            },
            output: OutputConfig {
                artifact: artifact.into(),
                report: None,
            },
            ..Default::default()
        }
    }

    /// Parse configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.loader.delimiter_byte()?;
        Ok(config)
    }

    /// Read configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `MINDCARE_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(source) = non_empty(ENV_SOURCE) {
            self.loader.source = PathBuf::from(source);
        }
        if let Some(output) = non_empty(ENV_OUTPUT) {
            self.output.artifact = PathBuf::from(output);
        }
        if let Some(report) = non_empty(ENV_REPORT) {
            self.output.report = Some(PathBuf::from(report));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_conventional_paths() {
        let config = PipelineConfig::default();
        assert_eq!(config.loader.source, PathBuf::from(DEFAULT_SOURCE));
        assert_eq!(config.output.artifact, PathBuf::from(DEFAULT_ARTIFACT));
        assert_eq!(config.output.report, Some(PathBuf::from(DEFAULT_REPORT)));
        assert_eq!(config.loader.schema_check, SchemaCheck::Positional);
        assert_eq!(config.validation.zero_sessions, ZeroSessionPolicy::NullRate);
        assert_eq!(config.validation.duplicates, DuplicatePolicy::KeepAll);
    }

    #[test]
    fn test_partial_toml() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [loader]
            source = "in/raw.tsv"
            delimiter = "\t"
            schema_check = "strict"

            [validation]
            zero_sessions = "drop"
            "#,
        )
        .unwrap();

        assert_eq!(config.loader.source, PathBuf::from("in/raw.tsv"));
        assert_eq!(config.loader.delimiter_byte().unwrap(), b'\t');
        assert_eq!(config.loader.schema_check, SchemaCheck::Strict);
        assert_eq!(config.validation.zero_sessions, ZeroSessionPolicy::Drop);
        assert_eq!(config.validation.duplicates, DuplicatePolicy::KeepAll);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let result = PipelineConfig::from_toml_str("[loader]\ndelimiter = \"§\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidDelimiter('§'))));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(PipelineConfig::from_toml_str("[validation]\nduplicates = \"merge\"\n").is_err());
        assert!("merge".parse::<DuplicatePolicy>().is_err());
        assert_eq!("keep-last".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::KeepLast);
        assert_eq!("NULL-RATE".parse::<ZeroSessionPolicy>().unwrap(), ZeroSessionPolicy::NullRate);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_SOURCE, "/data/raw.csv"),
            (ENV_OUTPUT, "/data/clean.csv"),
            (ENV_REPORT, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = PipelineConfig::default();
        config.apply_env_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.loader.source, PathBuf::from("/data/raw.csv"));
        assert_eq!(config.output.artifact, PathBuf::from("/data/clean.csv"));
        // Blank values leave the default in place
        assert_eq!(config.output.report, Some(PathBuf::from(DEFAULT_REPORT)));
    }

    #[test]
    fn test_missing_file() {
        let result = PipelineConfig::from_file("/nonexistent/mindcare.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
