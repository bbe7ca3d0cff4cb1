//! The collection pipeline: a bounded work queue feeding a pool of workers,
//! which build records through the object processor and stream them into the
//! output and status sinks.

/// Bounded single-writer work queue
pub mod queue;

/// Unbounded output and status sinks
pub mod sink;

/// Per-type record building and facet gates
pub mod processor;

/// Queue consumers
pub mod worker;

/// Well-known principal normalization and injection
pub mod well_known;

/// Run state machine and shutdown sequencing
pub mod orchestrator;

pub use orchestrator::{Collaborators, CollectionTask, PipelineState};
pub use processor::{FacetGates, ObjectProcessor};
