use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::{info, trace, warn};

use crate::collectors::context::CollectionContext;
use crate::collectors::snapshot::Snapshot;
use crate::collectors::traits::Producer;
use crate::models::RawDirectoryEntry;
use crate::pipeline::queue::WorkQueueWriter;

/// Entries that never produce useful output
fn is_ignored(dn: &str) -> bool {
    let dn = dn.to_lowercase();
    if dn.contains("cn=domainupdates,cn=system") {
        return true;
    }
    dn.contains("cn=policies,cn=system") && (dn.starts_with("cn=user") || dn.starts_with("cn=machine"))
}

fn in_configuration_partition(dn: &str) -> bool {
    dn.to_lowercase().contains("cn=configuration,dc=")
}

/// Replays the snapshot: domain partition first, configuration second
pub struct SnapshotProducer {
    snapshot: Arc<Snapshot>,
}

impl SnapshotProducer {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    async fn enqueue_where<F>(
        &self,
        queue: &WorkQueueWriter<RawDirectoryEntry>,
        ctx: &CollectionContext,
        partition: &str,
        filter: F,
    ) -> Result<usize>
    where
        F: Fn(&RawDirectoryEntry) -> bool + Send + Sync,
    {
        info!("Beginning enumeration of the {} partition", partition);
        let mut queued = 0;
        for entry in self.snapshot.entries().iter().filter(|e| filter(e)) {
            if ctx.is_cancelled() {
                warn!(
                    "Enumeration of the {} partition cancelled after {} entries",
                    partition, queued
                );
                break;
            }
            if is_ignored(&entry.distinguished_name) {
                trace!("Ignoring {}", entry.key());
                continue;
            }
            queue.put(entry.clone()).await?;
            trace!("Producer queued {}", entry.key());
            queued += 1;
        }
        info!("Queued {} entries from the {} partition", queued, partition);
        Ok(queued)
    }
}

#[async_trait]
impl Producer for SnapshotProducer {
    async fn produce(
        &self,
        queue: &WorkQueueWriter<RawDirectoryEntry>,
        ctx: &CollectionContext,
    ) -> Result<usize> {
        self.enqueue_where(queue, ctx, "domain", |e| {
            !in_configuration_partition(&e.distinguished_name)
        })
        .await
    }

    async fn produce_secondary_partition(
        &self,
        queue: &WorkQueueWriter<RawDirectoryEntry>,
        ctx: &CollectionContext,
    ) -> Result<usize> {
        self.enqueue_where(queue, ctx, "configuration", |e| {
            in_configuration_partition(&e.distinguished_name)
        })
        .await
    }
}
