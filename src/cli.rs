use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CollectorConfig;

/// Command-line arguments for the rust-ad-collector tool.
///
/// Every option except `--snapshot`, `--config` and the logging switches
/// overrides the matching field of the loaded configuration.
#[derive(Parser, Debug)]
#[clap(name = "rust-ad-collector", about = "Concurrent directory enumeration collector")]
pub struct Args {
    /// Directory snapshot (JSON) to enumerate
    #[clap(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Path to configuration YAML file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Number of worker tasks
    #[clap(short, long)]
    pub threads: Option<usize>,

    /// Collection methods or method groups (comma-separated)
    #[clap(short = 'm', long, value_delimiter = ',')]
    pub collection_methods: Option<Vec<String>>,

    /// Write a CSV log of every computer task outcome
    #[clap(long)]
    pub dump_computer_status: bool,

    /// Do not probe computers for an open SMB port
    #[clap(long)]
    pub skip_port_scan: bool,

    /// Do not skip computers with a stale machine password
    #[clap(long)]
    pub skip_password_check: bool,

    /// Skip the registry based logged-on user enumeration
    #[clap(long)]
    pub no_registry_logged_on: bool,

    /// Copy every raw attribute into the record properties
    #[clap(long)]
    pub collect_all_properties: bool,

    /// Port probe timeout in milliseconds
    #[clap(long)]
    pub port_scan_timeout: Option<u64>,

    /// Delay before every host call in milliseconds
    #[clap(long)]
    pub throttle: Option<u64>,

    /// Throttle jitter in percent
    #[clap(long)]
    pub jitter: Option<u8>,

    /// Seconds between progress reports
    #[clap(long)]
    pub status_interval: Option<u64>,

    /// Output directory
    #[clap(short, long)]
    pub output_directory: Option<PathBuf>,

    /// Prefix for every output file name
    #[clap(long)]
    pub output_prefix: Option<String>,

    /// Name of the output archive
    #[clap(long)]
    pub zip_filename: Option<String>,

    /// Leave the JSON files unarchived
    #[clap(long)]
    pub no_zip: bool,

    /// Indent the JSON output
    #[clap(long)]
    pub pretty_print: bool,

    /// Use the DNS host name as the computer display name
    #[clap(long)]
    pub real_dns_name: bool,

    /// Domain SID whose records are marked as collected (repeatable)
    #[clap(long = "domain-sid")]
    pub domain_sids: Vec<String>,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// Trace logging, includes per-object skips
    #[clap(long)]
    pub trace: bool,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the collector.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a default configuration file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = "config.yaml")]
        path: PathBuf,
    },
}

impl Args {
    /// Apply command line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut CollectorConfig) {
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(methods) = &self.collection_methods {
            config.collection_methods = methods.clone();
        }

        let flags = &mut config.flags;
        flags.dump_computer_status |= self.dump_computer_status;
        flags.skip_port_scan |= self.skip_port_scan;
        flags.skip_password_check |= self.skip_password_check;
        flags.no_registry_logged_on |= self.no_registry_logged_on;
        flags.collect_all_properties |= self.collect_all_properties;

        if let Some(timeout) = self.port_scan_timeout {
            config.port_scan_timeout_ms = timeout;
        }
        if let Some(throttle) = self.throttle {
            config.throttle_ms = throttle;
        }
        if let Some(jitter) = self.jitter {
            config.jitter_percent = jitter;
        }
        if let Some(interval) = self.status_interval {
            config.status_interval_secs = interval;
        }
        if let Some(dir) = &self.output_directory {
            config.output_directory = dir.clone();
        }
        if let Some(prefix) = &self.output_prefix {
            config.output_prefix = prefix.clone();
        }
        if self.zip_filename.is_some() {
            config.zip_filename = self.zip_filename.clone();
        }
        config.no_zip |= self.no_zip;
        config.pretty_print |= self.pretty_print;
        config.real_dns_name |= self.real_dns_name;
        if !self.domain_sids.is_empty() {
            config.collected_domain_sids = self.domain_sids.clone();
        }
    }
}
