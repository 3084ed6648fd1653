//! Raw source loader.
//!
//! Reads delimited text into a [`RawTable`], mapping the first fifteen
//! columns to the canonical fields by position.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, LoaderConfig, SchemaCheck};
use crate::models::{Field, RawRecord, RawTable, SOURCE_FIELD_COUNT};

/// Rows echoed at debug level after loading.
const SAMPLE_ROWS: usize = 5;

/// Loader errors. All of them abort the run.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot open source '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed source data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Source has {found} columns, expected at least {expected}")]
    TooFewColumns { found: usize, expected: usize },

    #[error("Column {position} is '{found}', expected '{expected}'")]
    SchemaMismatch {
        position: usize,
        expected: Field,
        found: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Loader for the raw patient spreadsheet export.
pub struct Loader {
    delimiter: u8,
    schema_check: SchemaCheck,
}

impl Loader {
    /// Create a loader from its configuration.
    pub fn new(config: &LoaderConfig) -> LoadResult<Self> {
        Ok(Self {
            delimiter: config.delimiter_byte()?,
            schema_check: config.schema_check,
        })
    }

    /// Load the source file at `path`.
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> LoadResult<RawTable> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        info!(source = %path.display(), "Loading raw patient data");
        self.load_reader(file)
    }

    /// Load from any reader.
    pub fn load_reader<R: Read>(&self, reader: R) -> LoadResult<RawTable> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        self.check_headers(&headers)?;

        let mut records = Vec::new();
        let mut row = StringRecord::new();
        while rdr.read_record(&mut row)? {
            records.push(RawRecord::from_cells(records.len() + 1, row.iter()));
        }

        let table = RawTable { headers, records };
        info!(
            rows = table.len(),
            columns = table.column_count(),
            "Raw data loaded"
        );
        for record in table.records.iter().take(SAMPLE_ROWS) {
            debug!(row = record.row, cells = ?record.cells().collect::<Vec<_>>(), "Sample row");
        }

        Ok(table)
    }

    fn check_headers(&self, headers: &[String]) -> LoadResult<()> {
        if headers.len() < SOURCE_FIELD_COUNT {
            return Err(LoadError::TooFewColumns {
                found: headers.len(),
                expected: SOURCE_FIELD_COUNT,
            });
        }

        for (position, (field, header)) in Field::SOURCE.iter().zip(headers).enumerate() {
            if field.matches_header(header) {
                continue;
            }
            match self.schema_check {
                SchemaCheck::Strict => {
                    return Err(LoadError::SchemaMismatch {
                        position: position + 1,
                        expected: *field,
                        found: header.clone(),
                    });
                }
                SchemaCheck::Positional => {
                    warn!(
                        position = position + 1,
                        found = %header,
                        mapped_to = %field,
                        "Source header differs from canonical name; mapping by position"
                    );
                }
            }
        }

        if headers.len() > SOURCE_FIELD_COUNT {
            debug!(
                ignored = headers.len() - SOURCE_FIELD_COUNT,
                "Ignoring columns past the canonical fifteen"
            );
        }

        Ok(())
    }
}
