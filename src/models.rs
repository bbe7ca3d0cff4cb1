//! Core data models shared by the producer, the workers and the sinks.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::STATUS_SUCCESS;

/// Typed output records and the facet data they carry
pub mod output;

/// One raw directory record as handed out by a producer.
///
/// Attribute names are stored lower-cased. A raw entry is consumed by exactly
/// one worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawDirectoryEntry {
    #[serde(rename = "distinguishedname")]
    pub distinguished_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl RawDirectoryEntry {
    pub fn new(distinguished_name: impl Into<String>) -> Self {
        Self {
            distinguished_name: distinguished_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter, mostly used by tests and snapshot tooling
    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Identifying key used in log lines
    pub fn key(&self) -> &str {
        &self.distinguished_name
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(&name.to_ascii_lowercase())
    }

    /// Single-valued string attribute. Multi-valued attributes yield their first value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.attribute(name)? {
            Value::String(s) => Some(s.as_str()),
            Value::Array(values) => values.first().and_then(Value::as_str),
            _ => None,
        }
    }

    /// Multi-valued string attribute. A single string is returned as a one-element list.
    pub fn get_strings(&self, name: &str) -> Vec<String> {
        match self.attribute(name) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Integer attribute, accepting both JSON numbers and numeric strings
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.attribute(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.attribute(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

/// Closed set of directory object classifications.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    User,
    Computer,
    Group,
    Domain,
    OU,
    GPO,
    Container,
    RootCA,
    #[serde(rename = "AIACA")]
    IntermediateCA,
    EnterpriseCA,
    NTAuthStore,
    CertTemplate,
    IssuancePolicy,
    Base,
}

impl Label {
    /// Every label that produces an output record
    pub const OUTPUT_LABELS: [Label; 13] = [
        Label::User,
        Label::Computer,
        Label::Group,
        Label::Domain,
        Label::OU,
        Label::GPO,
        Label::Container,
        Label::RootCA,
        Label::IntermediateCA,
        Label::EnterpriseCA,
        Label::NTAuthStore,
        Label::CertTemplate,
        Label::IssuancePolicy,
    ];

    /// Position in [`Label::OUTPUT_LABELS`], `None` for `Base`
    pub fn output_index(&self) -> Option<usize> {
        Self::OUTPUT_LABELS.iter().position(|l| l == self)
    }

    /// Certificate services family of object types
    pub fn is_cert_authority_family(&self) -> bool {
        matches!(
            self,
            Label::RootCA
                | Label::IntermediateCA
                | Label::EnterpriseCA
                | Label::NTAuthStore
                | Label::CertTemplate
                | Label::IssuancePolicy
        )
    }

    /// Name of the per-type output file (without prefix or extension)
    pub fn output_file_stem(&self) -> &'static str {
        match self {
            Label::User => "users",
            Label::Computer => "computers",
            Label::Group => "groups",
            Label::Domain => "domains",
            Label::OU => "ous",
            Label::GPO => "gpos",
            Label::Container => "containers",
            Label::RootCA => "rootcas",
            Label::IntermediateCA => "aiacas",
            Label::EnterpriseCA => "enterprisecas",
            Label::NTAuthStore => "ntauthstores",
            Label::CertTemplate => "certtemplates",
            Label::IssuancePolicy => "issuancepolicies",
            Label::Base => "base",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::IntermediateCA => f.write_str("AIACA"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Typed view of a raw entry produced by the resolver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResolvedResult {
    pub object_type: Label,
    pub display_name: String,
    pub domain: String,
    pub domain_sid: Option<String>,
    pub object_id: String,
    pub is_domain_controller: bool,
}

/// One diagnostic line for the computer status audit log
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ComputerStatusEvent {
    pub computer_name: String,
    pub task: String,
    pub status: String,
}

impl ComputerStatusEvent {
    pub fn new(computer_name: &str, task: &str, status: &str) -> Self {
        Self {
            computer_name: computer_name.to_string(),
            task: task.to_string(),
            status: status.to_string(),
        }
    }

    pub fn success(computer_name: &str, task: &str) -> Self {
        Self::new(computer_name, task, STATUS_SUCCESS)
    }

    pub fn failure(computer_name: &str, task: &str, reason: &str) -> Self {
        Self::new(computer_name, task, reason)
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Final handle returned once both sinks have drained
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PipelineResult {
    /// Archive (or output directory when zipping is disabled)
    pub artifact: PathBuf,
    /// Computer status audit log, when diagnostics were requested
    pub status_log: Option<PathBuf>,
    pub records_written: usize,
    pub records_by_label: BTreeMap<Label, usize>,
    pub status_events: usize,
    pub items_processed: usize,
    pub items_skipped: usize,
    pub items_failed: usize,
    pub well_known_injected: usize,
}
