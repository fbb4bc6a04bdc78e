//! Stampede - numbered fixture generator
//!
//! Produces `total_count` near-identical copies of a set of template
//! artifacts, each tagged with a zero-padded identifier, for load-testing
//! tools that consume many similarly named files.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use stampede_domain::{ArtifactWriter, ReplicationEngine, ReplicationJob, RunReport, SqlModelProducer};
use stampede_fs::{FsArtifactWriter, TemplateTreeProducer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Command, CopyArgs, LogFormat, SynthesizeArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(cli.log_format);

    info!("Starting stampede");

    let job = cli.job()?;

    let report = match &cli.command {
        Command::Copy(args) => run_copy(job, args).await?,
        Command::Synthesize(args) => run_synthesize(job, args).await?,
    };

    info!(
        copies = report.tasks_succeeded,
        artifacts = report.artifacts_written,
        elapsed_ms = report.elapsed().as_millis() as u64,
        artifacts_per_second = report.artifacts_per_second(),
        "Done"
    );

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
    }
}

async fn run_copy(job: ReplicationJob, args: &CopyArgs) -> Result<RunReport> {
    // The target may sit inside the source tree; its copies are not templates
    let producer = TemplateTreeProducer::new(&args.source, &args.extension).excluding(&args.target);
    let writer = FsArtifactWriter::new(&args.target);

    // Fail on an unreadable source tree, or a target that is the source
    // itself, before any task is dispatched
    let templates = producer
        .discover()
        .await
        .with_context(|| format!("Cannot read template tree {}", args.source.display()))?;

    if templates.is_empty() {
        warn!(
            source = %args.source.display(),
            extension = %producer.extension(),
            "No templates found, copies will be empty"
        );
    } else {
        info!(templates = templates.len(), "Templates discovered");
    }

    if args.include_originals {
        for artifact in producer.originals().await? {
            writer.write(&artifact).await?;
        }
        info!(count = templates.len(), "Originals copied");
    }

    let engine = ReplicationEngine::new(job, producer, writer);
    Ok(engine.run().await?)
}

async fn run_synthesize(job: ReplicationJob, args: &SynthesizeArgs) -> Result<RunReport> {
    let producer = SqlModelProducer::new(&args.staging);
    let writer = FsArtifactWriter::new(&args.target);

    let engine = ReplicationEngine::new(job, producer, writer);
    Ok(engine.run().await?)
}
