use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mindcare_core::config::{DuplicatePolicy, PipelineConfig, SchemaCheck, ZeroSessionPolicy};
use mindcare_core::CleanDataset;

#[derive(Parser)]
#[command(name = "mindcare")]
#[command(about = "Clean and normalize mental-health patient records")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the cleaning pipeline and write the cleaned artifact
    Clean(CleanArgs),
    /// Load a cleaned artifact and print its summary statistics
    Inspect {
        /// Path to a cleaned CSV
        artifact: PathBuf,
    },
}

#[derive(Args)]
struct CleanArgs {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Raw source CSV
    #[arg(long)]
    source: Option<PathBuf>,

    /// Cleaned artifact destination
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON report destination
    #[arg(long)]
    report: Option<PathBuf>,

    /// Do not write the JSON report
    #[arg(long, conflicts_with = "report")]
    no_report: bool,

    /// Fail when source headers do not match the canonical names
    #[arg(long)]
    strict_schema: bool,

    /// Zero-assigned records: null-rate or drop
    #[arg(long, value_parser = parse_policy::<ZeroSessionPolicy>)]
    zero_sessions: Option<ZeroSessionPolicy>,

    /// Repeated Patient_IDs: keep-all, keep-first or keep-last
    #[arg(long, value_parser = parse_policy::<DuplicatePolicy>)]
    duplicates: Option<DuplicatePolicy>,
}

fn parse_policy<T>(value: &str) -> Result<T, String>
where
    T: std::str::FromStr<Err = mindcare_core::config::ConfigError>,
{
    value.parse::<T>().map_err(|e| e.to_string())
}

impl CleanArgs {
    /// Defaults < config file < environment < flags.
    fn resolve(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        config.apply_env();

        if let Some(source) = &self.source {
            config.loader.source = source.clone();
        }
        if let Some(output) = &self.output {
            config.output.artifact = output.clone();
        }
        if let Some(report) = &self.report {
            config.output.report = Some(report.clone());
        }
        if self.no_report {
            config.output.report = None;
        }
        if self.strict_schema {
            config.loader.schema_check = SchemaCheck::Strict;
        }
        if let Some(policy) = self.zero_sessions {
            config.validation.zero_sessions = policy;
        }
        if let Some(policy) = self.duplicates {
            config.validation.duplicates = policy;
        }
        Ok(config)
    }
}

fn init_logging(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("mindcare=info".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_json)?;

    match cli.command {
        Commands::Clean(args) => {
            let config = args.resolve()?;
            info!(
                source = %config.loader.source.display(),
                output = %config.output.artifact.display(),
                "Starting cleaning run"
            );
            let report = mindcare_core::run(&config).context("cleaning run failed")?;
            println!("{}", report);
        }
        Commands::Inspect { artifact } => {
            let dataset = CleanDataset::read_path(&artifact)
                .with_context(|| format!("reading {}", artifact.display()))?;
            if dataset.recomputed_fixed_rate {
                println!("Attendance_Rate_Fixed was missing; recomputed from session counts.");
            }
            println!("{}", dataset.summary());
        }
    }

    Ok(())
}
