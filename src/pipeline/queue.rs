//! Bounded single-writer, multi-reader work queue.
//!
//! The writer half is deliberately not `Clone`: there is exactly one producer
//! handle and `complete` consumes it, so putting after completion or completing
//! twice does not compile. Readers drain every buffered item before they see
//! end-of-stream.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, Mutex};

/// Create a bounded work queue with the given capacity
pub fn work_queue<T>(capacity: usize) -> (WorkQueueWriter<T>, WorkQueueReader<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        WorkQueueWriter { tx },
        WorkQueueReader {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// The single producing end of the queue
pub struct WorkQueueWriter<T> {
    tx: mpsc::Sender<T>,
}

impl<T> WorkQueueWriter<T> {
    /// Enqueue one item, suspending while the queue is full.
    ///
    /// Fails only when every reader has gone away.
    pub async fn put(&self, item: T) -> Result<()> {
        self.tx
            .send(item)
            .await
            .map_err(|_| anyhow!("work queue has no remaining readers"))
    }

    /// Number of free slots right now
    pub fn remaining_capacity(&self) -> usize {
        self.tx.capacity()
    }

    /// Signal that no more items will be put. Buffered items stay readable.
    pub fn complete(self) {
        drop(self.tx);
    }
}

/// Shared consuming end of the queue, cloned once per worker
pub struct WorkQueueReader<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for WorkQueueReader<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> WorkQueueReader<T> {
    /// Take the next item, or `None` once the queue is completed and drained
    pub async fn take(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}
