use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_json::{json, Value};
use zip::{write::FileOptions, ZipWriter};

use crate::config::{CollectionMethodSet, CollectorConfig};
use crate::constants::{ARCHIVE_EXTENSION, OUTPUT_FORMAT_VERSION};
use crate::models::output::OutputRecord;
use crate::models::Label;
use crate::pipeline::sink::SinkWriter;

/// Output sink writer producing one JSON document per record type.
///
/// Records are buffered per label while the run is in progress. On
/// [`SinkWriter::finish`] each non-empty buffer is written to
/// `<prefix>_<timestamp>_<type>.json` and, unless `no_zip` is set, the files
/// are packed into a single archive and removed.
pub struct ArchiveWriter {
    output_directory: PathBuf,
    prefix: String,
    timestamp: String,
    zip_filename: Option<String>,
    no_zip: bool,
    pretty_print: bool,
    methods: CollectionMethodSet,
    buffers: BTreeMap<Label, Vec<Value>>,
}

impl ArchiveWriter {
    /// # Arguments
    ///
    /// * `config` - Run configuration supplying the output options
    /// * `methods` - Resolved methods, recorded in every file's metadata
    /// * `timestamp` - File name timestamp shared with the status log
    pub fn new(config: &CollectorConfig, methods: CollectionMethodSet, timestamp: &str) -> Self {
        Self {
            output_directory: config.output_directory.clone(),
            prefix: config.output_prefix.clone(),
            timestamp: timestamp.to_string(),
            zip_filename: config.zip_filename.clone(),
            no_zip: config.no_zip,
            pretty_print: config.pretty_print,
            methods,
            buffers: BTreeMap::new(),
        }
    }

    fn file_name(&self, stem: &str, extension: &str) -> String {
        if self.prefix.is_empty() {
            format!("{}_{}.{}", self.timestamp, stem, extension)
        } else {
            format!("{}_{}_{}.{}", self.prefix, self.timestamp, stem, extension)
        }
    }

    fn archive_path(&self) -> PathBuf {
        match &self.zip_filename {
            Some(name) if Path::new(name).extension().is_some() => self.output_directory.join(name),
            Some(name) => self
                .output_directory
                .join(format!("{}.{}", name, ARCHIVE_EXTENSION)),
            None => self
                .output_directory
                .join(self.file_name("output", ARCHIVE_EXTENSION)),
        }
    }

    fn write_document(&self, label: Label, records: Vec<Value>) -> Result<PathBuf> {
        let stem = label.output_file_stem();
        let path = self.output_directory.join(self.file_name(stem, "json"));
        let document = json!({
            "data": records,
            "meta": {
                "type": stem,
                "count": records.len(),
                "version": OUTPUT_FORMAT_VERSION,
                "methods": self.methods.bits(),
            }
        });

        let file = File::create(&path)
            .context(format!("Failed to create output file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        if self.pretty_print {
            serde_json::to_writer_pretty(&mut writer, &document)
        } else {
            serde_json::to_writer(&mut writer, &document)
        }
        .context(format!("Failed to serialize {}", path.display()))?;
        writer
            .flush()
            .context(format!("Failed to flush {}", path.display()))?;

        debug!("Wrote {} {} records to {}", document["meta"]["count"], stem, path.display());
        Ok(path)
    }
}

impl SinkWriter<OutputRecord> for ArchiveWriter {
    fn write(&mut self, item: OutputRecord) -> Result<()> {
        let label = item.label();
        let value = serde_json::to_value(&item)
            .context(format!("Failed to serialize record {}", item.object_identifier()))?;
        self.buffers.entry(label).or_default().push(value);
        Ok(())
    }

    fn finish(mut self) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_directory).context(format!(
            "Failed to create output directory {}",
            self.output_directory.display()
        ))?;

        let buffers = std::mem::take(&mut self.buffers);
        let mut files = Vec::with_capacity(buffers.len());
        for (label, records) in buffers {
            files.push(self.write_document(label, records)?);
        }

        if self.no_zip {
            info!("Wrote {} output files to {}", files.len(), self.output_directory.display());
            return Ok(self.output_directory);
        }

        let archive = self.archive_path();
        compress_files(&files, &archive)?;
        for file in &files {
            if let Err(e) = fs::remove_file(file) {
                warn!("Failed to remove {} after archiving: {}", file.display(), e);
            }
        }

        info!("Output archive: {}", archive.display());
        Ok(archive)
    }
}

/// Pack `files` into a new zip archive at `archive`, flat by file name
pub fn compress_files(files: &[PathBuf], archive: &Path) -> Result<()> {
    let out = File::create(archive)
        .context(format!("Failed to create archive {}", archive.display()))?;
    let mut zip = ZipWriter::new(out);
    let options = FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(6))
        .unix_permissions(0o644);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context(format!("Invalid output file name {}", path.display()))?;
        zip.start_file(name.clone(), options)
            .context(format!("Failed to start file entry for {}", name))?;
        let mut reader = File::open(path)
            .context(format!("Failed to open {}", path.display()))?;
        io::copy(&mut reader, &mut zip)
            .context(format!("Failed to write {} to archive", name))?;
    }

    zip.finish()
        .context(format!("Failed to finalize archive {}", archive.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::output::{BaseRecord, Group, Properties, User};
    use std::io::Read;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> CollectorConfig {
        CollectorConfig {
            output_directory: dir.to_path_buf(),
            output_prefix: "test".to_string(),
            ..Default::default()
        }
    }

    fn user(id: &str) -> OutputRecord {
        OutputRecord::User(User {
            base: BaseRecord::new(id, Properties::new()),
            ..Default::default()
        })
    }

    fn group(id: &str) -> OutputRecord {
        OutputRecord::Group(Group {
            base: BaseRecord::new(id, Properties::new()),
            members: Some(Vec::new()),
            ..Default::default()
        })
    }

    #[test]
    fn test_unzipped_files_carry_meta() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.no_zip = true;

        let mut writer = ArchiveWriter::new(&config, CollectionMethodSet::dc_only(), "20240115143052");
        writer.write(user("S-1-5-21-1-2-3-1104")).unwrap();
        writer.write(user("S-1-5-21-1-2-3-1105")).unwrap();
        writer.write(group("S-1-5-21-1-2-3-512")).unwrap();
        let out = writer.finish().unwrap();
        assert_eq!(out, temp_dir.path());

        let users_path = temp_dir.path().join("test_20240115143052_users.json");
        let users: Value = serde_json::from_str(&fs::read_to_string(users_path).unwrap()).unwrap();
        assert_eq!(users["meta"]["type"], "users");
        assert_eq!(users["meta"]["count"], 2);
        assert_eq!(users["meta"]["version"], OUTPUT_FORMAT_VERSION);
        assert_eq!(users["meta"]["methods"], CollectionMethodSet::dc_only().bits());
        assert_eq!(users["data"][1]["ObjectIdentifier"], "S-1-5-21-1-2-3-1105");

        assert!(temp_dir.path().join("test_20240115143052_groups.json").exists());
        assert!(!temp_dir.path().join("test_20240115143052_computers.json").exists());
    }

    #[test]
    fn test_zip_contains_every_type_and_removes_loose_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        let mut writer = ArchiveWriter::new(&config, CollectionMethodSet::all(), "20240115143052");
        writer.write(user("S-1-5-21-1-2-3-1104")).unwrap();
        writer.write(group("S-1-5-21-1-2-3-512")).unwrap();
        let archive = writer.finish().unwrap();

        assert_eq!(archive, temp_dir.path().join("test_20240115143052_output.zip"));
        assert!(!temp_dir.path().join("test_20240115143052_users.json").exists());

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
        let mut content = String::new();
        zip.by_name("test_20240115143052_groups.json")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        let groups: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(groups["data"][0]["Members"], json!([]));
    }

    #[test]
    fn test_custom_zip_filename() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.zip_filename = Some("contoso".to_string());

        let writer = ArchiveWriter::new(&config, CollectionMethodSet::all(), "20240115143052");
        let archive = writer.finish().unwrap();
        assert_eq!(archive, temp_dir.path().join("contoso.zip"));

        let zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn test_pretty_print() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.no_zip = true;
        config.pretty_print = true;

        let mut writer = ArchiveWriter::new(&config, CollectionMethodSet::all(), "1");
        writer.write(user("S-1-5-21-1-2-3-1104")).unwrap();
        writer.finish().unwrap();

        let content = fs::read_to_string(temp_dir.path().join("test_1_users.json")).unwrap();
        assert!(content.contains('\n'));
    }
}
