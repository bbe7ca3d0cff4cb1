use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::collection_methods::CollectionMethodSet;
use crate::constants::{
    DEFAULT_OUTPUT_PREFIX, DEFAULT_PORT_SCAN_TIMEOUT_MS, DEFAULT_STATUS_INTERVAL_SECS,
    DEFAULT_THREADS,
};

/// Boolean switches that alter how computers are processed
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CollectionFlags {
    /// Emit one status event per computer task to the status log
    pub dump_computer_status: bool,
    pub skip_port_scan: bool,
    pub skip_password_check: bool,
    /// Skip the registry based logged-on user enumeration
    pub no_registry_logged_on: bool,
    /// Copy every raw attribute into the record properties
    pub collect_all_properties: bool,
}

/// Immutable configuration for one collection run.
///
/// Loaded once, adjusted by command line overrides, then shared behind an
/// `Arc` for the rest of the run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CollectorConfig {
    pub threads: usize,
    pub collection_methods: Vec<String>,
    pub flags: CollectionFlags,
    pub port_scan_timeout_ms: u64,
    pub throttle_ms: u64,
    pub jitter_percent: u8,
    pub status_interval_secs: u64,
    pub output_directory: PathBuf,
    pub output_prefix: String,
    pub zip_filename: Option<String>,
    pub no_zip: bool,
    pub pretty_print: bool,
    /// Use the DNS host name as the computer display name
    pub real_dns_name: bool,
    /// Domain SIDs whose records are marked as collected
    pub collected_domain_sids: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            collection_methods: vec!["Default".to_string()],
            flags: CollectionFlags::default(),
            port_scan_timeout_ms: DEFAULT_PORT_SCAN_TIMEOUT_MS,
            throttle_ms: 0,
            jitter_percent: 0,
            status_interval_secs: DEFAULT_STATUS_INTERVAL_SECS,
            output_directory: PathBuf::from("."),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            zip_filename: None,
            no_zip: false,
            pretty_print: false,
            real_dns_name: false,
            collected_domain_sids: Vec::new(),
        }
    }
}

impl CollectorConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: CollectorConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Resolve the configured method names into a bitset
    pub fn method_set(&self) -> Result<CollectionMethodSet> {
        CollectionMethodSet::parse_names(&self.collection_methods)
            .context("Invalid collection_methods in configuration")
    }

    /// Worker count, never below one
    pub fn worker_count(&self) -> usize {
        self.threads.max(1)
    }

    pub fn is_collected_domain(&self, domain_sid: &str) -> bool {
        self.collected_domain_sids
            .iter()
            .any(|sid| sid.eq_ignore_ascii_case(domain_sid))
    }
}

/// Load a configuration file or create a default one.
///
/// # Arguments
///
/// * `config_path` - Optional path to a configuration file
///
/// # Returns
///
/// * `Ok(CollectorConfig)` - The loaded configuration, or the defaults (written
///   to `config_path` when a path was given but did not exist)
/// * `Err` - If the config file exists but cannot be parsed, or the default
///   cannot be written
pub fn load_or_create_config(config_path: Option<&Path>) -> Result<CollectorConfig> {
    match config_path {
        Some(path) if path.exists() => CollectorConfig::from_yaml_file(path),
        Some(path) => {
            info!("Creating default config at {}", path.display());
            let default_config = CollectorConfig::default();
            default_config.save_to_yaml_file(path)?;
            Ok(default_config)
        }
        None => {
            debug!("No config path provided, using defaults");
            Ok(CollectorConfig::default())
        }
    }
}
