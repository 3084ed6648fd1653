//! Mindcare Core Library
//!
//! Cleaning and normalization pipeline for mental-health patient records.
//!
//! # Architecture
//!
//! ```text
//! Raw CSV export ─▶ Loader ─▶ Normalizer ─▶ Validator ─▶ Reconciler ─▶ Writer
//!                   (positional   (per-field     (drop / clamp    (derived    (atomic CSV
//!                    mapping)      rules)         / dedupe)        rate)       + report)
//! ```
//!
//! The pipeline is batch and run-to-completion: it either publishes the
//! complete cleaned artifact or fails before touching the destination.
//!
//! # Modules
//!
//! - [`models`]: Canonical fields, raw and cleaned records
//! - [`loader`]: Positional CSV loader with optional strict header check
//! - [`cleaner`]: Normalizer, validator and reconciler
//! - [`export`]: Artifact writer, summary report, consumer reader
//! - [`config`]: Paths and policies
//! - [`pipeline`]: End-to-end run

pub mod cleaner;
pub mod config;
pub mod export;
pub mod loader;
pub mod models;
pub mod pipeline;

// Re-export commonly used types
pub use cleaner::{CleanOutcome, CleanStats, Cleaner, Normalizer, Validator};
pub use config::{DuplicatePolicy, PipelineConfig, SchemaCheck, ZeroSessionPolicy};
pub use export::{CleanDataset, CleaningReport, SummaryStats};
pub use loader::Loader;
pub use models::{Field, PatientRecord, RawRecord, RawTable};
pub use pipeline::{run, PipelineError};
