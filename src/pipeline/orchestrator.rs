//! Pipeline wiring and shutdown sequencing.
//!
//! The run moves through a fixed sequence of states. Each stage only starts
//! once every writer of the stage before it is gone:
//!
//! ```text
//! Idle -> Running -> ProducingPrimary -> ProducingSecondary
//!      -> DrainingWorkers -> InjectingWellKnown -> DrainingSinks -> Done
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::future::join_all;
use log::{debug, error, info, warn};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::collectors::context::CollectionContext;
use crate::collectors::traits::{
    AvailabilityProbe, DirectoryCollector, HostCollector, Producer, Resolver, WellKnownCatalog,
};
use crate::constants::WORK_QUEUE_CAPACITY;
use crate::models::output::OutputRecord;
use crate::models::{ComputerStatusEvent, PipelineResult};
use crate::pipeline::processor::ObjectProcessor;
use crate::pipeline::queue::work_queue;
use crate::pipeline::sink::{spawn_sink, SinkWriter};
use crate::pipeline::well_known;
use crate::pipeline::worker::{spawn_workers, RunStats};

/// Stages of one collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    ProducingPrimary,
    ProducingSecondary,
    DrainingWorkers,
    InjectingWellKnown,
    DrainingSinks,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Every external collaborator the pipeline needs
#[derive(Clone)]
pub struct Collaborators {
    pub producer: Arc<dyn Producer>,
    pub resolver: Arc<dyn Resolver>,
    pub directory: Arc<dyn DirectoryCollector>,
    pub hosts: Arc<dyn HostCollector>,
    pub probe: Arc<dyn AvailabilityProbe>,
    pub catalog: Arc<dyn WellKnownCatalog>,
}

pub type StateLog = Arc<Mutex<Vec<PipelineState>>>;

/// One configured collection run
pub struct CollectionTask<W, S>
where
    W: SinkWriter<OutputRecord>,
    S: SinkWriter<ComputerStatusEvent>,
{
    collaborators: Collaborators,
    ctx: CollectionContext,
    output_writer: W,
    status_writer: Option<S>,
    tracker: StateTracker,
}

/// Current state plus an optional log of every transition
struct StateTracker {
    current: PipelineState,
    observer: Option<StateLog>,
}

impl StateTracker {
    fn transition(&mut self, next: PipelineState) {
        debug!("Pipeline state {} -> {}", self.current, next);
        self.current = next;
        if let Some(observer) = &self.observer {
            if let Ok(mut log) = observer.lock() {
                log.push(next);
            }
        }
    }
}

impl<W, S> CollectionTask<W, S>
where
    W: SinkWriter<OutputRecord>,
    S: SinkWriter<ComputerStatusEvent>,
{
    pub fn new(collaborators: Collaborators, ctx: CollectionContext, output_writer: W) -> Self {
        Self {
            collaborators,
            ctx,
            output_writer,
            status_writer: None,
            tracker: StateTracker {
                current: PipelineState::Idle,
                observer: None,
            },
        }
    }

    /// Enable the status sink. Without it no status events are recorded.
    pub fn with_status_writer(mut self, writer: S) -> Self {
        self.status_writer = Some(writer);
        self
    }

    /// Record every state transition into `log`
    pub fn with_state_observer(mut self, log: StateLog) -> Self {
        self.tracker.observer = Some(log);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.tracker.current
    }

    /// Run the pipeline to completion.
    ///
    /// Per-item and per-phase failures are logged and never end the run; only
    /// a sink that cannot be finalized is returned as an error.
    pub async fn run(self) -> Result<PipelineResult> {
        let started = Instant::now();
        let Self {
            collaborators,
            ctx,
            output_writer,
            status_writer,
            mut tracker,
        } = self;
        let worker_count = ctx.config.worker_count();

        tracker.transition(PipelineState::Running);
        info!(
            "Starting collection with {} workers, methods: {}",
            worker_count, ctx.methods
        );

        let (output_tx, output_handle) = spawn_sink("output", output_writer);
        let status = status_writer.map(|writer| spawn_sink("status", writer));

        let processor = Arc::new(ObjectProcessor::new(
            collaborators.directory,
            collaborators.hosts,
            collaborators.probe,
            ctx.clone(),
            status.as_ref().map(|(tx, _)| tx.clone()),
        ));

        let (queue_writer, queue_reader) = work_queue(WORK_QUEUE_CAPACITY);
        let stats = Arc::new(RunStats::default());
        let workers = spawn_workers(
            worker_count,
            &queue_reader,
            &collaborators.resolver,
            &processor,
            &output_tx,
            &stats,
        );
        drop(queue_reader);

        let reporter_stop = CancellationToken::new();
        let reporter = StatusReporter::new(
            Arc::clone(&stats),
            Duration::from_secs(ctx.config.status_interval_secs.max(1)),
            reporter_stop.clone(),
        )
        .start_reporting();

        tracker.transition(PipelineState::ProducingPrimary);
        match collaborators.producer.produce(&queue_writer, &ctx).await {
            Ok(count) => info!("Primary enumeration queued {} objects", count),
            Err(e) => error!("Primary enumeration failed: {:#}", e),
        }

        tracker.transition(PipelineState::ProducingSecondary);
        match collaborators
            .producer
            .produce_secondary_partition(&queue_writer, &ctx)
            .await
        {
            Ok(count) => info!("Configuration enumeration queued {} objects", count),
            Err(e) => error!("Configuration enumeration failed: {:#}", e),
        }
        queue_writer.complete();

        tracker.transition(PipelineState::DrainingWorkers);
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!("Worker task ended abnormally: {}", e);
            }
        }
        drop(processor);
        reporter_stop.cancel();
        if let Err(e) = reporter.await {
            warn!("Status reporter ended abnormally: {}", e);
        }
        info!(
            "Workers finished: {} written, {} skipped, {} failed",
            stats.processed(),
            stats.skipped(),
            stats.failed()
        );

        tracker.transition(PipelineState::InjectingWellKnown);
        let well_known_injected = match collaborators.catalog.principals() {
            Ok(principals) => well_known::inject(principals, &output_tx, &stats)
                .unwrap_or_else(|e| {
                    error!("Failed to inject well-known principals: {:#}", e);
                    0
                }),
            Err(e) => {
                error!("Failed to build well-known principals: {:#}", e);
                0
            }
        };

        tracker.transition(PipelineState::DrainingSinks);
        // Both sinks are closed before either failure is reported
        let output = output_handle
            .close(output_tx)
            .await
            .context("Failed to finalize output");
        let status = match status {
            Some((tx, handle)) => handle
                .close(tx)
                .await
                .context("Failed to finalize computer status log")
                .map(Some),
            None => Ok(None),
        };
        let output = match (output, status.as_ref()) {
            (Err(e), Err(status_err)) => {
                error!("{:#}", status_err);
                return Err(e);
            }
            (output, _) => output?,
        };
        let (status_log, status_events) = match status? {
            Some(outcome) => (Some(outcome.artifact), outcome.written),
            None => (None, 0),
        };

        tracker.transition(PipelineState::Done);
        info!(
            "Collection finished in {:.2}s: {} records written to {}",
            started.elapsed().as_secs_f64(),
            output.written,
            output.artifact.display()
        );

        Ok(PipelineResult {
            artifact: output.artifact,
            status_log,
            records_written: output.written,
            records_by_label: stats.written_by_label(),
            status_events,
            items_processed: stats.processed(),
            items_skipped: stats.skipped(),
            items_failed: stats.failed(),
            well_known_injected,
        })
    }
}

/// Periodic progress line while workers are running
struct StatusReporter {
    stats: Arc<RunStats>,
    interval: Duration,
    stop: CancellationToken,
    start_time: Instant,
}

impl StatusReporter {
    fn new(stats: Arc<RunStats>, interval: Duration, stop: CancellationToken) -> Self {
        Self {
            stats,
            interval,
            stop,
            start_time: Instant::now(),
        }
    }

    /// Report progress in a background task until stopped
    fn start_reporting(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut last_total = 0;
            loop {
                tokio::select! {
                    _ = self.stop.cancelled() => break,
                    _ = sleep(self.interval) => {}
                }

                let total = self.stats.total();
                let elapsed = self.start_time.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 { total as f64 / elapsed } else { 0.0 };
                info!(
                    "Status: {} objects finished (+{}), {:.1} objects/s, {} failed",
                    total,
                    total - last_total,
                    rate,
                    self.stats.failed()
                );
                last_total = total;
            }
        })
    }
}
