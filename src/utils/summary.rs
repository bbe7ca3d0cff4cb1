use anyhow::{Context, Result};
use serde_json::json;
use uuid::Uuid;

use crate::config::CollectionMethodSet;
use crate::models::PipelineResult;

/// Create a JSON summary of a collection run.
///
/// # Arguments
///
/// * `hostname` - The host the collector ran on
/// * `timestamp` - RFC 3339 timestamp of when the run started
/// * `methods` - Collection methods the run was configured with
/// * `result` - Final pipeline result
/// * `duration_seconds` - Wall clock duration of the run
///
/// # Returns
///
/// * `Ok(String)` - Pretty printed JSON summary
/// * `Err` - If JSON serialization fails
///
/// # Example Output
///
/// ```json
/// {
///   "collection_id": "550e8400-e29b-41d4-a716-446655440000",
///   "hostname": "analyst-01",
///   "records_written": 1042,
///   "records_by_label": { "User": 800, "Computer": 200, ... },
///   ...
/// }
/// ```
pub fn create_run_summary(
    hostname: &str,
    timestamp: &str,
    methods: CollectionMethodSet,
    result: &PipelineResult,
    duration_seconds: f64,
) -> Result<String> {
    let summary = json!({
        "collection_id": Uuid::new_v4().to_string(),
        "hostname": hostname,
        "collection_time": timestamp,
        "collector_version": env!("CARGO_PKG_VERSION"),
        "collection_methods": methods.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        "artifact": result.artifact,
        "status_log": result.status_log,
        "records_written": result.records_written,
        "records_by_label": result.records_by_label,
        "items_processed": result.items_processed,
        "items_skipped": result.items_skipped,
        "items_failed": result.items_failed,
        "well_known_injected": result.well_known_injected,
        "status_events": result.status_events,
        "duration_seconds": duration_seconds,
    });

    serde_json::to_string_pretty(&summary).context("Failed to serialize run summary to JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Label;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    #[test]
    fn test_create_run_summary() {
        let mut by_label = BTreeMap::new();
        by_label.insert(Label::User, 3);
        by_label.insert(Label::IntermediateCA, 1);
        let result = PipelineResult {
            artifact: PathBuf::from("/tmp/out.zip"),
            status_log: None,
            records_written: 4,
            records_by_label: by_label,
            status_events: 0,
            items_processed: 4,
            items_skipped: 2,
            items_failed: 1,
            well_known_injected: 0,
        };

        let json = create_run_summary(
            "analyst-01",
            "2024-01-15T14:30:52Z",
            CollectionMethodSet::dc_only(),
            &result,
            1.5,
        )
        .unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["hostname"], "analyst-01");
        assert_eq!(parsed["records_written"], 4);
        assert_eq!(parsed["records_by_label"]["User"], 3);
        assert_eq!(parsed["records_by_label"]["AIACA"], 1);
        assert_eq!(parsed["items_failed"], 1);
        assert!(parsed["status_log"].is_null());
        assert!(Uuid::parse_str(parsed["collection_id"].as_str().unwrap()).is_ok());
        assert_eq!(parsed["collection_methods"].as_array().unwrap().len(), 7);
    }
}
