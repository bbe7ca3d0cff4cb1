use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use log::{debug, error, trace};
use tokio::task::JoinHandle;

use crate::collectors::traits::Resolver;
use crate::models::output::OutputRecord;
use crate::models::{Label, RawDirectoryEntry};
use crate::pipeline::processor::ObjectProcessor;
use crate::pipeline::queue::WorkQueueReader;
use crate::pipeline::sink::SinkSender;

/// Per-run item counters shared by all workers
#[derive(Debug, Default)]
pub struct RunStats {
    pub processed: AtomicUsize,
    pub skipped: AtomicUsize,
    pub failed: AtomicUsize,
    written_by_label: [AtomicUsize; 13],
}

impl RunStats {
    /// Count one record handed to the output sink
    pub fn record_written(&self, label: Label) {
        if let Some(index) = label.output_index() {
            self.written_by_label[index].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records handed to the output sink, per label, omitting zero counts
    pub fn written_by_label(&self) -> BTreeMap<Label, usize> {
        Label::OUTPUT_LABELS
            .iter()
            .zip(self.written_by_label.iter())
            .map(|(label, count)| (*label, count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.processed() + self.skipped() + self.failed()
    }
}

enum ItemOutcome {
    Written,
    Skipped,
}

/// One consumer draining the work queue
pub struct Worker {
    id: usize,
    queue: WorkQueueReader<RawDirectoryEntry>,
    resolver: Arc<dyn Resolver>,
    processor: Arc<ObjectProcessor>,
    output: SinkSender<OutputRecord>,
    stats: Arc<RunStats>,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: WorkQueueReader<RawDirectoryEntry>,
        resolver: Arc<dyn Resolver>,
        processor: Arc<ObjectProcessor>,
        output: SinkSender<OutputRecord>,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            id,
            queue,
            resolver,
            processor,
            output,
            stats,
        }
    }

    /// Pull items until the queue reports end-of-stream.
    ///
    /// A failing or panicking item is logged with its key and counted; the
    /// worker moves on to the next one.
    pub async fn run(self) {
        debug!("Worker {} started", self.id);
        while let Some(entry) = self.queue.take().await {
            match AssertUnwindSafe(self.handle(&entry)).catch_unwind().await {
                Ok(Ok(ItemOutcome::Written)) => {
                    self.stats.processed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Ok(ItemOutcome::Skipped)) => {
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(e)) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!("Worker {} failed to process {}: {:#}", self.id, entry.key(), e);
                }
                Err(_) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!("Worker {} panicked while processing {}", self.id, entry.key());
                }
            }
        }
        debug!("Worker {} finished", self.id);
    }

    async fn handle(&self, entry: &RawDirectoryEntry) -> Result<ItemOutcome> {
        let resolved = match self.resolver.resolve(entry).await? {
            Some(resolved) if resolved.object_type != Label::Base => resolved,
            _ => {
                trace!("Skipping {}: unresolved or base object", entry.key());
                return Ok(ItemOutcome::Skipped);
            }
        };

        let Some(mut record) = self.processor.process(entry, &resolved).await else {
            trace!("No output for {}", entry.key());
            return Ok(ItemOutcome::Skipped);
        };

        if let OutputRecord::Domain(domain) = &mut record {
            let config = &self.processor.context().config;
            if config.is_collected_domain(&domain.base.object_identifier) {
                domain.base.set_property("collected", true);
            }
        }

        let label = record.label();
        self.output.send(record)?;
        self.stats.record_written(label);
        Ok(ItemOutcome::Written)
    }
}

/// Spawn `count` workers sharing the same queue reader
pub fn spawn_workers(
    count: usize,
    queue: &WorkQueueReader<RawDirectoryEntry>,
    resolver: &Arc<dyn Resolver>,
    processor: &Arc<ObjectProcessor>,
    output: &SinkSender<OutputRecord>,
    stats: &Arc<RunStats>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|id| {
            let worker = Worker::new(
                id,
                queue.clone(),
                Arc::clone(resolver),
                Arc::clone(processor),
                output.clone(),
                Arc::clone(stats),
            );
            tokio::spawn(worker.run())
        })
        .collect()
}
