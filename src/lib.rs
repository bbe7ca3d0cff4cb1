//! # rust-ad-collector
//!
//! A concurrent directory-service enumeration and enrichment collector written
//! in Rust.
//!
//! ## Overview
//!
//! rust-ad-collector walks a directory data source one object at a time,
//! resolves each raw entry into a typed, security-relevant record and streams
//! the results into durable output, while separately tracking per-host
//! collection diagnostics.
//!
//! ## Features
//!
//! - **Bounded concurrency**: a backpressured work queue feeding a worker pool
//! - **Facet gating**: collection methods decide which sub-collections run
//! - **Two sinks**: output records and computer status events never block workers
//! - **Well-known principals**: injected and normalized once per run
//! - **Flexible configuration**: YAML config with command line overrides
//! - **Snapshot replay**: drive the full pipeline from a recorded JSON snapshot
//!
//! ## Usage
//!
//! ### Running a Collection
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use rust_ad_collector::collectors::context::CollectionContext;
//! use rust_ad_collector::collectors::probe::PortProbe;
//! use rust_ad_collector::collectors::snapshot::{
//!     Snapshot, SnapshotCatalog, SnapshotDirectory, SnapshotHosts, SnapshotProducer,
//!     SnapshotResolver,
//! };
//! use rust_ad_collector::config::CollectorConfig;
//! use rust_ad_collector::models::ComputerStatusEvent;
//! use rust_ad_collector::pipeline::{Collaborators, CollectionTask};
//! use rust_ad_collector::utils::archive::ArchiveWriter;
//! use rust_ad_collector::utils::status_log::StatusLogWriter;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Arc::new(CollectorConfig::default());
//! let methods = config.method_set()?;
//! let snapshot = Arc::new(Snapshot::load(Path::new("contoso.json"))?);
//!
//! let collaborators = Collaborators {
//!     producer: Arc::new(SnapshotProducer::new(snapshot.clone())),
//!     resolver: Arc::new(SnapshotResolver::new(snapshot.clone())),
//!     directory: Arc::new(SnapshotDirectory::new(snapshot.clone())),
//!     hosts: Arc::new(SnapshotHosts::new(snapshot.clone())),
//!     probe: Arc::new(PortProbe::new()),
//!     catalog: Arc::new(SnapshotCatalog::new(snapshot)),
//! };
//!
//! let ctx = CollectionContext::new(config.clone(), methods);
//! let writer = ArchiveWriter::new(&config, methods, "20240101120000");
//! let task: CollectionTask<_, StatusLogWriter> = CollectionTask::new(collaborators, ctx, writer);
//! let result = task.run().await?;
//! println!("Wrote {} records to {}", result.records_written, result.artifact.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Raw entries, resolved results and output records
//! - [`collectors`]: Collaborator traits and their snapshot-backed implementations
//! - [`config`]: Run configuration and collection methods
//! - [`pipeline`]: Work queue, workers, object processor, sinks and orchestrator
//! - [`utils`]: Archive and status log writers, run summary
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models and structures used throughout the application
pub mod models;

/// Collaborators feeding and enriching the pipeline
pub mod collectors;

/// Output writers and reporting utilities
pub mod utils;

/// Configuration management and collection methods
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Bounded-concurrency collection pipeline
pub mod pipeline;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
