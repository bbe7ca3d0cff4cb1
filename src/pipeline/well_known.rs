use log::{debug, info};

use crate::constants::ENTERPRISE_DC_SUFFIX;
use crate::models::output::OutputRecord;
use crate::pipeline::sink::SinkSender;
use crate::pipeline::worker::RunStats;

/// Prepare one synthesized principal for output.
///
/// Groups without members are dropped. Everything else is marked
/// `reconcile=false`, except identifiers ending in the Enterprise Domain
/// Controllers suffix, which keep their reconcile state.
pub fn normalize(mut record: OutputRecord) -> Option<OutputRecord> {
    if let OutputRecord::Group(group) = &record {
        if group.members.as_ref().map_or(true, Vec::is_empty) {
            debug!(
                "Dropping well-known group {} without members",
                group.base.object_identifier
            );
            return None;
        }
    }

    if !record.object_identifier().ends_with(ENTERPRISE_DC_SUFFIX) {
        record.base_mut().set_property("reconcile", false);
    }

    Some(record)
}

/// Normalize the catalog and write the survivors to the output sink.
///
/// # Returns
///
/// The number of records written
pub fn inject(
    principals: Vec<OutputRecord>,
    output: &SinkSender<OutputRecord>,
    stats: &RunStats,
) -> anyhow::Result<usize> {
    let mut written = 0;
    for record in principals.into_iter().filter_map(normalize) {
        let label = record.label();
        output.send(record)?;
        stats.record_written(label);
        written += 1;
    }
    info!("Injected {} well-known principals", written);
    Ok(written)
}
