use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use rust_ad_collector::cli::{Args, Commands};
use rust_ad_collector::collectors::context::CollectionContext;
use rust_ad_collector::collectors::probe::PortProbe;
use rust_ad_collector::collectors::snapshot::{
    Snapshot, SnapshotCatalog, SnapshotDirectory, SnapshotHosts, SnapshotProducer,
    SnapshotResolver,
};
use rust_ad_collector::config::{load_or_create_config, CollectorConfig};
use rust_ad_collector::models::PipelineResult;
use rust_ad_collector::pipeline::{Collaborators, CollectionTask};
use rust_ad_collector::utils::archive::ArchiveWriter;
use rust_ad_collector::utils::status_log::StatusLogWriter;
use rust_ad_collector::utils::summary;

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(&args)?;

    // Handle subcommands
    if let Some(cmd) = &args.command {
        return handle_subcommand(cmd);
    }

    let snapshot_path = args
        .snapshot
        .clone()
        .ok_or_else(|| anyhow!("No snapshot given. Use --snapshot <FILE> or run init-config"))?;

    // Load and process configuration
    let mut config = load_or_create_config(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    let snapshot = Arc::new(Snapshot::load(&snapshot_path)?);
    if config.collected_domain_sids.is_empty() {
        config.collected_domain_sids = snapshot.domain_sids();
    }

    let runtime = Runtime::new().context("Failed to create Tokio runtime")?;
    runtime.block_on(run_collection(Arc::new(config), snapshot))
}

/// Initialize logging with the requested verbosity level
fn initialize_logging(args: &Args) -> Result<()> {
    let log_level = if args.trace {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

/// Handle subcommands
fn handle_subcommand(cmd: &Commands) -> Result<()> {
    match cmd {
        Commands::InitConfig { path } => {
            info!("Creating default configuration file at {}", path.display());
            CollectorConfig::default().save_to_yaml_file(path)?;
            info!("Configuration created successfully");
            Ok(())
        }
    }
}

/// Wire the snapshot collaborators into a collection task and run it
async fn run_collection(config: Arc<CollectorConfig>, snapshot: Arc<Snapshot>) -> Result<()> {
    let methods = config.method_set()?;
    let started = Instant::now();
    let started_at = chrono::Utc::now();
    let timestamp = started_at.format("%Y%m%d%H%M%S").to_string();

    info!(
        "Starting collection of {} entries with {} workers",
        snapshot.len(),
        config.worker_count()
    );

    let collaborators = Collaborators {
        producer: Arc::new(SnapshotProducer::new(snapshot.clone())),
        resolver: Arc::new(SnapshotResolver::new(snapshot.clone())),
        directory: Arc::new(SnapshotDirectory::new(snapshot.clone())),
        hosts: Arc::new(SnapshotHosts::new(snapshot.clone())),
        probe: Arc::new(PortProbe::new()),
        catalog: Arc::new(SnapshotCatalog::new(snapshot)),
    };

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let ctx = CollectionContext::new(config.clone(), methods).with_cancellation(cancel);
    let output = ArchiveWriter::new(&config, methods, &timestamp);
    let mut task: CollectionTask<ArchiveWriter, StatusLogWriter> =
        CollectionTask::new(collaborators, ctx, output);
    if config.flags.dump_computer_status {
        task = task.with_status_writer(StatusLogWriter::create(&config, &timestamp)?);
    }

    let result = task.run().await?;
    write_run_summary(&config, &timestamp, &started_at.to_rfc3339(), &result, started)?;

    info!("Collection completed successfully");
    Ok(())
}

/// Cancel the run on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, finishing in-flight objects");
                cancel.cancel();
            }
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
    });
}

/// Log the run summary and write it next to the output
fn write_run_summary(
    config: &CollectorConfig,
    timestamp: &str,
    collection_time: &str,
    result: &PipelineResult,
    started: Instant,
) -> Result<()> {
    let hostname = hostname::get()
        .map_err(|e| anyhow!("Failed to get hostname: {}", e))?
        .to_string_lossy()
        .to_string();

    let summary_json = summary::create_run_summary(
        &hostname,
        collection_time,
        config.method_set()?,
        result,
        started.elapsed().as_secs_f64(),
    )?;

    let file_name = if config.output_prefix.is_empty() {
        format!("{}_summary.json", timestamp)
    } else {
        format!("{}_{}_summary.json", config.output_prefix, timestamp)
    };
    let summary_path: PathBuf = config.output_directory.join(file_name);
    fs::write(&summary_path, &summary_json)
        .context(format!("Failed to write run summary to {}", summary_path.display()))?;

    info!(
        "Run summary: {} records, {} processed, {} skipped, {} failed in {:.2}s",
        result.records_written,
        result.items_processed,
        result.items_skipped,
        result.items_failed,
        started.elapsed().as_secs_f64()
    );
    for (label, count) in &result.records_by_label {
        info!("  {:<16} {}", label.to_string(), count);
    }
    info!("Summary written to {}", summary_path.display());
    Ok(())
}
