use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::trace;

use crate::collectors::snapshot::Snapshot;
use crate::collectors::traits::Resolver;
use crate::constants::UAC_SERVER_TRUST_ACCOUNT;
use crate::models::{Label, RawDirectoryEntry, ResolvedResult};

/// Classify an entry by its `objectclass` values
pub fn classify(entry: &RawDirectoryEntry) -> Label {
    let classes: Vec<String> = entry
        .get_strings("objectclass")
        .into_iter()
        .map(|c| c.to_lowercase())
        .collect();
    let has = |name: &str| classes.iter().any(|c| c == name);
    let dn = entry.distinguished_name.to_lowercase();

    if has("computer") {
        Label::Computer
    } else if has("user") || has("msds-groupmanagedserviceaccount") {
        Label::User
    } else if has("group") {
        Label::Group
    } else if has("domaindns") || has("domain") {
        Label::Domain
    } else if has("organizationalunit") {
        Label::OU
    } else if has("grouppolicycontainer") {
        Label::GPO
    } else if has("pkienrollmentservice") {
        Label::EnterpriseCA
    } else if has("pkicertificatetemplate") {
        Label::CertTemplate
    } else if has("mspki-enterprise-oid") {
        Label::IssuancePolicy
    } else if has("certificationauthority") {
        if dn.contains("cn=ntauthcertificates") {
            Label::NTAuthStore
        } else if dn.contains("cn=aia,") {
            Label::IntermediateCA
        } else if dn.contains("cn=certification authorities,") {
            Label::RootCA
        } else {
            Label::Base
        }
    } else if has("container") {
        Label::Container
    } else {
        Label::Base
    }
}

/// SID for security principals and domains, upper-cased GUID otherwise
pub fn object_identifier(entry: &RawDirectoryEntry) -> Option<String> {
    entry
        .get_str("objectsid")
        .map(|sid| sid.to_uppercase())
        .or_else(|| entry.get_str("objectguid").map(|guid| guid.to_uppercase()))
}

/// `DC=contoso,DC=local` components joined into `CONTOSO.LOCAL`
pub fn domain_name_from_dn(dn: &str) -> String {
    dn.split(',')
        .filter_map(|rdn| {
            let (key, value) = rdn.trim().split_once('=')?;
            key.eq_ignore_ascii_case("dc").then(|| value.to_uppercase())
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn first_rdn_value(dn: &str) -> &str {
    dn.split(',')
        .next()
        .and_then(|rdn| rdn.split_once('='))
        .map(|(_, value)| value)
        .unwrap_or(dn)
}

fn display_name(entry: &RawDirectoryEntry, label: Label, domain: &str) -> String {
    let name = match label {
        Label::Domain => return domain.to_string(),
        Label::Computer => {
            let short = entry
                .get_str("samaccountname")
                .map(|sam| sam.trim_end_matches('$'))
                .unwrap_or_else(|| first_rdn_value(&entry.distinguished_name));
            return format!("{}.{}", short, domain).to_uppercase();
        }
        Label::User | Label::Group => entry.get_str("samaccountname"),
        Label::GPO => entry.get_str("displayname"),
        _ => entry.get_str("name"),
    };
    let name = name
        .or_else(|| entry.get_str("cn"))
        .unwrap_or_else(|| first_rdn_value(&entry.distinguished_name));
    format!("{}@{}", name, domain).to_uppercase()
}

/// Resolver deriving identity from snapshot attributes
pub struct SnapshotResolver {
    snapshot: Arc<Snapshot>,
}

impl SnapshotResolver {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl Resolver for SnapshotResolver {
    async fn resolve(&self, entry: &RawDirectoryEntry) -> Result<Option<ResolvedResult>> {
        if entry.get_bool("isdeleted") == Some(true) {
            trace!("Ignoring deleted object {}", entry.key());
            return Ok(None);
        }

        let Some(object_id) = object_identifier(entry) else {
            trace!("No objectsid or objectguid on {}", entry.key());
            return Ok(None);
        };

        let object_type = classify(entry);
        let domain = domain_name_from_dn(&entry.distinguished_name);
        let is_domain_controller = object_type == Label::Computer
            && entry
                .get_i64("useraccountcontrol")
                .map_or(false, |uac| uac & UAC_SERVER_TRUST_ACCOUNT != 0);

        Ok(Some(ResolvedResult {
            object_type,
            display_name: display_name(entry, object_type, &domain),
            domain_sid: self.snapshot.domain_sid_of(entry),
            domain,
            object_id,
            is_domain_controller,
        }))
    }
}
