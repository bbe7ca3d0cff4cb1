//! Unbounded single-reader sinks for output records and status events.
//!
//! Writers never block. A dedicated reader task drains the channel into a
//! [`SinkWriter`] and finalizes it once every sender is gone.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use log::{debug, error};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Destination that serializes items drained from a sink
pub trait SinkWriter<T>: Send + 'static {
    /// Persist one item
    fn write(&mut self, item: T) -> Result<()>;

    /// Flush everything and return the path of the produced artifact
    fn finish(self) -> Result<PathBuf>;
}

/// Cloneable, non-blocking write handle
pub struct SinkSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for SinkSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> SinkSender<T> {
    /// Sender whose items are read straight from the returned receiver
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Hand an item to the reader task
    pub fn send(&self, item: T) -> Result<()> {
        self.tx
            .send(item)
            .map_err(|_| anyhow!("sink reader has already stopped"))
    }
}

/// Completion handle of a running sink
pub struct SinkOutcome {
    pub artifact: PathBuf,
    pub written: usize,
    pub failed: usize,
}

pub struct SinkHandle {
    name: &'static str,
    task: JoinHandle<Result<SinkOutcome>>,
}

/// Start the reader loop for `writer`
///
/// # Arguments
///
/// * `name` - Sink name used in log lines
/// * `writer` - Destination the reader drains into
///
/// # Returns
///
/// The write handle and the completion handle of the reader task
pub fn spawn_sink<T, W>(name: &'static str, mut writer: W) -> (SinkSender<T>, SinkHandle)
where
    T: Send + 'static,
    W: SinkWriter<T>,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<T>();

    let task = tokio::spawn(async move {
        let mut written = 0usize;
        let mut failed = 0usize;
        while let Some(item) = rx.recv().await {
            match writer.write(item) {
                Ok(()) => written += 1,
                Err(e) => {
                    failed += 1;
                    error!("{} sink failed to write item: {:#}", name, e);
                }
            }
        }

        debug!("{} sink drained {} items, finalizing", name, written);
        let artifact = tokio::task::spawn_blocking(move || writer.finish())
            .await
            .context(format!("{} sink finalizer panicked", name))??;

        Ok(SinkOutcome {
            artifact,
            written,
            failed,
        })
    });

    (SinkSender { tx }, SinkHandle { name, task })
}

impl SinkHandle {
    /// Close the sink and wait for the reader to finalize.
    ///
    /// Consumes the last sender so nothing can be written after close. Any
    /// other clones must already be dropped, otherwise this waits for them.
    pub async fn close<T>(self, sender: SinkSender<T>) -> Result<SinkOutcome> {
        drop(sender);
        self.task
            .await
            .context(format!("{} sink task panicked", self.name))?
    }
}
