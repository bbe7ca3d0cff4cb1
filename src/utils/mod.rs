//! Output artifacts and reporting.
//!
//! ## Components
//!
//! - **Archive**: per-type JSON documents packed into a ZIP archive
//! - **Status log**: CSV audit trail of per-computer task outcomes
//! - **Summary**: JSON run summary
//! - **Time**: directory timestamp conversions
//!
//! ## Common Use Cases
//!
//! ### Writing Output Through a Sink
//!
//! ```no_run
//! use rust_ad_collector::config::{CollectionMethodSet, CollectorConfig};
//! use rust_ad_collector::pipeline::sink::SinkWriter;
//! use rust_ad_collector::utils::archive::ArchiveWriter;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = CollectorConfig::default();
//! let writer = ArchiveWriter::new(&config, CollectionMethodSet::default_methods(), "20240101120000");
//! let archive = writer.finish()?;
//! println!("Created archive: {}", archive.display());
//! # Ok(())
//! # }
//! ```

/// Per-type JSON output and ZIP archive creation
pub mod archive;

/// CSV computer status log
pub mod status_log;

/// Run summary generation
pub mod summary;

/// FILETIME and generalized time conversions
pub mod time;
