use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::config::CollectorConfig;
use crate::models::ComputerStatusEvent;
use crate::pipeline::sink::SinkWriter;

const HEADER: &str = "ComputerName,Task,Status";

/// Status sink writer appending one CSV row per computer task.
///
/// The file is created when the writer is constructed so a run that emits no
/// events still leaves a header-only log behind.
pub struct StatusLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl StatusLogWriter {
    pub fn create(config: &CollectorConfig, timestamp: &str) -> Result<Self> {
        fs::create_dir_all(&config.output_directory).context(format!(
            "Failed to create output directory {}",
            config.output_directory.display()
        ))?;

        let file_name = if config.output_prefix.is_empty() {
            format!("{}_compstatus.csv", timestamp)
        } else {
            format!("{}_{}_compstatus.csv", config.output_prefix, timestamp)
        };
        let path = config.output_directory.join(file_name);
        let file = File::create(&path)
            .context(format!("Failed to create status log {}", path.display()))?;

        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", HEADER)
            .context(format!("Failed to write header to {}", path.display()))?;
        Ok(Self { path, writer })
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl SinkWriter<ComputerStatusEvent> for StatusLogWriter {
    fn write(&mut self, item: ComputerStatusEvent) -> Result<()> {
        writeln!(
            self.writer,
            "{},{},{}",
            escape(&item.computer_name),
            escape(&item.task),
            escape(&item.status)
        )
        .context(format!("Failed to append to {}", self.path.display()))
    }

    fn finish(mut self) -> Result<PathBuf> {
        self.writer
            .flush()
            .context(format!("Failed to flush {}", self.path.display()))?;
        info!("Computer status log: {}", self.path.display());
        Ok(self.path)
    }
}
