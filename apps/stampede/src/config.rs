//! Command line and environment configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use stampede_domain::synthesis::DEFAULT_STAGING_DIR;
use stampede_domain::ReplicationJob;
use stampede_fs::DEFAULT_EXTENSION;

/// Default slot count (2 << 6)
pub const DEFAULT_MAX_PARALLEL: usize = 128;

/// Generate numbered copies of fixture templates
#[derive(Parser, Debug)]
#[command(name = "stampede", version, about)]
pub struct Cli {
    /// Number of copies to produce [default: 1000 for copy, 2000 for synthesize]
    #[arg(long, env = "STAMPEDE_COPIES", global = true)]
    pub copies: Option<usize>,

    /// Maximum number of copies written concurrently
    #[arg(long, env = "STAMPEDE_MAX_PARALLEL", default_value_t = DEFAULT_MAX_PARALLEL, global = true)]
    pub max_parallel: usize,

    /// Inserted between each file stem and its identifier [default: "-" for copy, "_" for synthesize]
    #[arg(long, env = "STAMPEDE_DELIMITER", global = true, allow_hyphen_values = true)]
    pub delimiter: Option<String>,

    /// JSON job file; replaces --copies, --max-parallel and --delimiter
    #[arg(long, env = "STAMPEDE_JOB_FILE", global = true)]
    pub job_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, env = "STAMPEDE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy every template file of a source tree once per identifier
    Copy(CopyArgs),
    /// Render the built-in SQL models once per identifier
    Synthesize(SynthesizeArgs),
}

#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Template tree to replicate
    #[arg(long, env = "STAMPEDE_SOURCE", default_value = "models_template")]
    pub source: PathBuf,

    /// Directory the copies are written to
    #[arg(long, env = "STAMPEDE_TARGET", default_value = "models")]
    pub target: PathBuf,

    /// Only files with this extension are replicated
    #[arg(long, env = "STAMPEDE_EXTENSION", default_value = DEFAULT_EXTENSION)]
    pub extension: String,

    /// Also copy the templates unsuffixed before the run
    #[arg(long, env = "STAMPEDE_INCLUDE_ORIGINALS")]
    pub include_originals: bool,
}

#[derive(Args, Debug)]
pub struct SynthesizeArgs {
    /// Directory the models are written to
    #[arg(long, env = "STAMPEDE_TARGET", default_value = "models")]
    pub target: PathBuf,

    /// Subdirectory of the target for staging models
    #[arg(long, env = "STAMPEDE_STAGING", default_value = DEFAULT_STAGING_DIR)]
    pub staging: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Command {
    fn default_copies(&self) -> usize {
        match self {
            Command::Copy(_) => 1000,
            Command::Synthesize(_) => 2000,
        }
    }

    fn default_delimiter(&self) -> &'static str {
        match self {
            Command::Copy(_) => "-",
            Command::Synthesize(_) => "_",
        }
    }
}

impl Cli {
    /// Build the validated job for this invocation
    pub fn job(&self) -> Result<ReplicationJob> {
        if let Some(path) = &self.job_file {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read job file {}", path.display()))?;
            let job: ReplicationJob = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse job file {}", path.display()))?;
            job.validate()?;
            return Ok(job);
        }

        let copies = self
            .copies
            .unwrap_or_else(|| self.command.default_copies());
        let delimiter = self
            .delimiter
            .clone()
            .unwrap_or_else(|| self.command.default_delimiter().to_string());

        Ok(ReplicationJob::new(copies, self.max_parallel, delimiter)?)
    }
}
