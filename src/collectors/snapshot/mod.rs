//! Directory snapshot source.
//!
//! A snapshot is a JSON array of `{distinguishedname, attributes}` objects,
//! typically exported from a live directory. Every collaborator of the
//! pipeline has a snapshot-backed implementation here, so a full collection
//! run can be replayed offline:
//!
//! - [`SnapshotProducer`] enumerates the domain partition, then the
//!   configuration partition
//! - [`SnapshotResolver`] classifies entries and derives their identifiers
//! - [`SnapshotDirectory`] answers directory facets from attributes and the
//!   DN index
//! - [`SnapshotHosts`] answers host facets from a recorded `hostdata`
//!   attribute
//! - [`SnapshotCatalog`] synthesizes the well-known principals per domain

mod catalog;
mod directory;
mod hosts;
mod producer;
mod resolver;

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use serde_json::Value;

use crate::models::output::TypedPrincipal;
use crate::models::{Label, RawDirectoryEntry};

pub use catalog::SnapshotCatalog;
pub use directory::SnapshotDirectory;
pub use hosts::SnapshotHosts;
pub use producer::SnapshotProducer;
pub use resolver::{classify, domain_name_from_dn, object_identifier, SnapshotResolver};

/// In-memory directory snapshot with lookup indexes
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: Vec<RawDirectoryEntry>,
    by_dn: HashMap<String, usize>,
    by_sid: HashMap<String, usize>,
    by_host: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl Snapshot {
    /// Load a snapshot from a JSON file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the snapshot export
    ///
    /// # Returns
    ///
    /// * `Ok(Snapshot)` - The indexed snapshot
    /// * `Err` - If the file cannot be read or is not a JSON entry array
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open snapshot file: {}", path.display()))?;
        let entries: Vec<RawDirectoryEntry> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))?;
        info!("Loaded {} entries from {}", entries.len(), path.display());
        Ok(Self::from_entries(entries))
    }

    /// Index raw entries. Attribute names are lower-cased on the way in.
    pub fn from_entries(entries: Vec<RawDirectoryEntry>) -> Self {
        let mut snapshot = Snapshot::default();

        for mut entry in entries {
            entry.attributes = std::mem::take(&mut entry.attributes)
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect();

            let index = snapshot.entries.len();
            snapshot
                .by_dn
                .insert(entry.distinguished_name.to_lowercase(), index);
            if let Some(sid) = entry.get_str("objectsid") {
                snapshot.by_sid.insert(sid.to_uppercase(), index);
            }
            // Only computers answer host lookups; CAs share their host's dNSHostName
            let is_computer = classify(&entry) == Label::Computer;
            if is_computer {
                if let Some(host) = entry.get_str("dnshostname") {
                    snapshot.by_host.insert(host.to_lowercase(), index);
                }
            }
            if let Some(sam) = entry.get_str("samaccountname") {
                let name = sam.to_lowercase();
                if let Some(short) = name.strip_suffix('$').filter(|_| is_computer) {
                    snapshot.by_host.entry(short.to_string()).or_insert(index);
                }
                snapshot.by_name.insert(name, index);
            }
            snapshot.entries.push(entry);
        }

        debug!(
            "Indexed snapshot: {} entries, {} SIDs, {} hosts",
            snapshot.entries.len(),
            snapshot.by_sid.len(),
            snapshot.by_host.len()
        );
        snapshot
    }

    pub fn entries(&self) -> &[RawDirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_dn(&self, dn: &str) -> Option<&RawDirectoryEntry> {
        self.by_dn.get(&dn.to_lowercase()).map(|&i| &self.entries[i])
    }

    pub fn by_sid(&self, sid: &str) -> Option<&RawDirectoryEntry> {
        self.by_sid.get(&sid.to_uppercase()).map(|&i| &self.entries[i])
    }

    pub fn by_account_name(&self, name: &str) -> Option<&RawDirectoryEntry> {
        self.by_name.get(&name.to_lowercase()).map(|&i| &self.entries[i])
    }

    /// Computer entry for a host name: full DNS name, short name, or the
    /// short name of an FQDN
    pub fn by_host(&self, host: &str) -> Option<&RawDirectoryEntry> {
        let host = host.to_lowercase();
        self.by_host
            .get(&host)
            .or_else(|| {
                host.split('.')
                    .next()
                    .and_then(|short| self.by_host.get(short))
            })
            .map(|&i| &self.entries[i])
    }

    /// Every entry classified as a domain
    pub fn domains(&self) -> impl Iterator<Item = &RawDirectoryEntry> {
        self.entries
            .iter()
            .filter(|e| classify(e) == Label::Domain)
    }

    /// Upper-cased SIDs of every domain in the snapshot
    pub fn domain_sids(&self) -> Vec<String> {
        self.domains()
            .filter_map(|e| e.get_str("objectsid"))
            .map(|sid| sid.to_uppercase())
            .collect()
    }

    /// Domain head entry for any DN inside that domain
    pub fn domain_of(&self, dn: &str) -> Option<&RawDirectoryEntry> {
        let lower = dn.to_lowercase();
        let start = lower.find("dc=")?;
        self.by_dn(&lower[start..])
    }

    /// SID of the domain `entry` belongs to
    pub fn domain_sid_of(&self, entry: &RawDirectoryEntry) -> Option<String> {
        if let Some(sid) = entry.get_str("objectsid") {
            if classify(entry) == Label::Domain {
                return Some(sid.to_string());
            }
            if sid.starts_with("S-1-5-21-") {
                if let Some((domain, _rid)) = sid.rsplit_once('-') {
                    return Some(domain.to_string());
                }
            }
        }
        self.domain_of(&entry.distinguished_name)
            .and_then(|d| d.get_str("objectsid"))
            .map(str::to_string)
    }

    /// Typed reference to the entry at `dn`, if it is in the snapshot and
    /// has an identifier
    pub fn principal_for_dn(&self, dn: &str) -> Option<TypedPrincipal> {
        let entry = self.by_dn(dn)?;
        Some(TypedPrincipal::new(object_identifier(entry)?, classify(entry)))
    }

    /// Typed reference for a SID. Unknown SIDs are reported as `Base`.
    pub fn principal_for_sid(&self, sid: &str) -> TypedPrincipal {
        let label = self.by_sid(sid).map(classify).unwrap_or(Label::Base);
        TypedPrincipal::new(sid.to_uppercase(), label)
    }

    /// Recorded attribute deserialized from its JSON value
    pub fn recorded<T: serde::de::DeserializeOwned>(
        entry: &RawDirectoryEntry,
        name: &str,
    ) -> Result<Option<T>> {
        match entry.attribute(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .with_context(|| format!("Malformed {} on {}", name, entry.key())),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::json;

    use super::Snapshot;
    use crate::models::RawDirectoryEntry;

    pub const DOMAIN_SID: &str = "S-1-5-21-100-200-300";

    /// Small CONTOSO.LOCAL forest covering every object type
    pub fn contoso() -> Snapshot {
        let entries = vec![
            RawDirectoryEntry::new("DC=contoso,DC=local")
                .with_attribute("objectClass", json!(["top", "domain", "domainDNS"]))
                .with_attribute("objectSid", DOMAIN_SID)
                .with_attribute("objectGUID", "0a1b2c3d-0000-0000-0000-000000000001")
                .with_attribute("msDS-Behavior-Version", 7)
                .with_attribute(
                    "gPLink",
                    "[LDAP://cn={31B2F340-016D-11D2-945F-00C04FB984F9},cn=policies,cn=system,DC=contoso,DC=local;0]",
                ),
            RawDirectoryEntry::new("CN=Users,DC=contoso,DC=local")
                .with_attribute("objectClass", json!(["top", "container"]))
                .with_attribute("objectGUID", "0a1b2c3d-0000-0000-0000-000000000002"),
            RawDirectoryEntry::new("CN=Alice,CN=Users,DC=contoso,DC=local")
                .with_attribute("objectClass", json!(["top", "person", "user"]))
                .with_attribute("objectSid", format!("{}-1104", DOMAIN_SID))
                .with_attribute("sAMAccountName", "alice")
                .with_attribute("userAccountControl", 512)
                .with_attribute("primaryGroupID", 513)
                .with_attribute("servicePrincipalName", json!(["MSSQLSvc/sql01.contoso.local:1433"]))
                .with_attribute("pwdLastSet", 133_000_000_000_000_000i64),
            RawDirectoryEntry::new("CN=Domain Admins,CN=Users,DC=contoso,DC=local")
                .with_attribute("objectClass", json!(["top", "group"]))
                .with_attribute("objectSid", format!("{}-512", DOMAIN_SID))
                .with_attribute("sAMAccountName", "Domain Admins")
                .with_attribute("adminCount", 1)
                .with_attribute(
                    "member",
                    json!([
                        "CN=Alice,CN=Users,DC=contoso,DC=local",
                        "CN=Ghost,CN=Users,DC=contoso,DC=local"
                    ]),
                ),
            RawDirectoryEntry::new("CN=DC01,OU=Domain Controllers,DC=contoso,DC=local")
                .with_attribute("objectClass", json!(["top", "person", "user", "computer"]))
                .with_attribute("objectSid", format!("{}-1000", DOMAIN_SID))
                .with_attribute("sAMAccountName", "DC01$")
                .with_attribute("dNSHostName", "dc01.contoso.local")
                .with_attribute("userAccountControl", 0x82000)
                .with_attribute("operatingSystem", "Windows Server 2022 Standard"),
            RawDirectoryEntry::new("CN=SQL01,CN=Computers,DC=contoso,DC=local")
                .with_attribute("objectClass", json!(["top", "person", "user", "computer"]))
                .with_attribute("objectSid", format!("{}-1105", DOMAIN_SID))
                .with_attribute("sAMAccountName", "SQL01$")
                .with_attribute("dNSHostName", "sql01.contoso.local")
                .with_attribute("userAccountControl", 4096)
                .with_attribute("operatingSystem", "Windows Server 2019 Standard"),
            RawDirectoryEntry::new("CN=DomainUpdates,CN=System,DC=contoso,DC=local")
                .with_attribute("objectClass", json!(["top", "container"])),
            RawDirectoryEntry::new(
                "CN=User,CN={31B2F340-016D-11D2-945F-00C04FB984F9},CN=Policies,CN=System,DC=contoso,DC=local",
            )
            .with_attribute("objectClass", json!(["top", "container"])),
            RawDirectoryEntry::new(
                "CN=CONTOSO-CA,CN=Enrollment Services,CN=Public Key Services,CN=Services,CN=Configuration,DC=contoso,DC=local",
            )
            .with_attribute("objectClass", json!(["top", "pKIEnrollmentService"]))
            .with_attribute("objectGUID", "0a1b2c3d-0000-0000-0000-000000000003")
            .with_attribute("name", "CONTOSO-CA")
            .with_attribute("dNSHostName", "sql01.contoso.local")
            .with_attribute("certificateTemplates", json!(["User", "Retired"])),
            RawDirectoryEntry::new(
                "CN=User,CN=Certificate Templates,CN=Public Key Services,CN=Services,CN=Configuration,DC=contoso,DC=local",
            )
            .with_attribute("objectClass", json!(["top", "pKICertificateTemplate"]))
            .with_attribute("objectGUID", "0a1b2c3d-0000-0000-0000-000000000004")
            .with_attribute("name", "User"),
        ];
        Snapshot::from_entries(entries)
    }
}
