//! Collaborators that feed and enrich the pipeline.
//!
//! The pipeline never talks to a directory or a host directly. Everything it
//! needs comes through the traits in [`traits`], and each run carries a
//! shared [`context::CollectionContext`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Pipeline workers             │
//! ├─────────────────────────────────────────┤
//! │          Collaborator traits            │
//! │  ┌──────────┬───────────┬───────────┐   │
//! │  │ Producer │ Resolver  │ Catalog   │   │
//! │  ├──────────┼───────────┼───────────┤   │
//! │  │Directory │   Hosts   │   Probe   │   │
//! │  └──────────┴───────────┴───────────┘   │
//! ├─────────────────────────────────────────┤
//! │          Concrete sources               │
//! │  ┌────────────────────┬────────────┐    │
//! │  │  Snapshot (JSON)   │  TCP probe │    │
//! │  └────────────────────┴────────────┘    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use rust_ad_collector::collectors::snapshot::{Snapshot, SnapshotResolver};
//!
//! # fn example() -> anyhow::Result<()> {
//! let snapshot = Arc::new(Snapshot::load(Path::new("contoso.json"))?);
//! let resolver = SnapshotResolver::new(snapshot.clone());
//! println!("{} entries loaded", snapshot.len());
//! # Ok(())
//! # }
//! ```

/// Collaborator traits and facet naming
pub mod traits;

/// Run-scoped context: config, methods, cancellation and throttling
pub mod context;

/// TCP availability probe
pub mod probe;

/// Snapshot-file backed implementations of every collaborator
pub mod snapshot;
