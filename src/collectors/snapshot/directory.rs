use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::collectors::snapshot::{classify, object_identifier, Snapshot};
use crate::collectors::traits::{DirectoryCollector, FacetRequest};
use crate::constants::{
    UAC_ACCOUNT_DISABLE, UAC_DONT_EXPIRE_PASSWORD,
    UAC_DONT_REQUIRE_PREAUTH, UAC_NOT_DELEGATED, UAC_PASSWORD_NOT_REQUIRED,
    UAC_TRUSTED_FOR_DELEGATION, UAC_TRUSTED_TO_AUTH_FOR_DELEGATION,
};
use crate::models::output::{
    Ace, ComputerProperties, DomainTrust, GpLink, GpoChanges, GroupProperties,
    IssuancePolicyProperties, Properties, PublishedTemplates, SpnTarget, TypedPrincipal,
    UserProperties,
};
use crate::models::{Label, RawDirectoryEntry};
use crate::utils::time::{filetime_to_unix, generalized_time_to_unix};

lazy_static! {
    /// One `[LDAP://<dn>;<status>]` element of a gPLink value
    static ref GPLINK_PATTERN: Regex = Regex::new(r"(?i)\[LDAP://([^;\]]+);(\d)\]").unwrap();
    /// GUID in the leading RDN of a policy DN
    static ref GPO_GUID_PATTERN: Regex =
        Regex::new(r"(?i)^cn=\{([0-9a-f\-]{36})\}").unwrap();
    /// `MSSQLSvc/<host>[:<port or instance>]`
    static ref SQL_SPN_PATTERN: Regex =
        Regex::new(r"(?i)^MSSQLSvc/([^:]+)(?::(.+))?$").unwrap();
}

/// Attributes holding recorded facet payloads rather than directory data
const RECORDED_FACET_ATTRIBUTES: [&str; 5] =
    ["hostdata", "aces", "isaclprotected", "inheritancehashes", "gpochanges"];

const DEFAULT_SQL_PORT: u16 = 1433;

fn uac(entry: &RawDirectoryEntry) -> i64 {
    entry.get_i64("useraccountcontrol").unwrap_or(0)
}

fn is_admin_count(entry: &RawDirectoryEntry) -> bool {
    entry.get_i64("admincount") == Some(1) || entry.get_bool("admincount") == Some(true)
}

fn parent_dn(dn: &str) -> Option<&str> {
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            ',' if !escaped => return Some(dn[i + 1..].trim_start()),
            _ => escaped = false,
        }
    }
    None
}

/// Upper-case hex SHA-256 of a base64 encoded certificate
fn cert_thumbprint(encoded: &str) -> Option<String> {
    let der = STANDARD.decode(encoded.trim()).ok()?;
    Some(format!("{:X}", Sha256::digest(&der)))
}

fn functional_level(version: i64) -> &'static str {
    match version {
        0 => "2000 Mixed/Native",
        1 => "2003 Interim",
        2 => "2003",
        3 => "2008",
        4 => "2008 R2",
        5 => "2012",
        6 => "2012 R2",
        7 => "2016",
        _ => "Unknown",
    }
}

/// Properties every record type carries when present
fn common_props(entry: &RawDirectoryEntry) -> Properties {
    let mut props = Properties::new();
    if let Some(description) = entry.get_str("description") {
        props.insert("description".to_string(), description.into());
    }
    if let Some(created) = entry
        .get_str("whencreated")
        .and_then(generalized_time_to_unix)
        .or_else(|| entry.get_i64("whencreated"))
    {
        props.insert("whencreated".to_string(), created.into());
    }
    props
}

fn insert_timestamps(entry: &RawDirectoryEntry, props: &mut Properties) {
    for name in ["lastlogon", "lastlogontimestamp", "pwdlastset"] {
        let value = entry.get_i64(name).map(filetime_to_unix).unwrap_or(0);
        props.insert(name.to_string(), value.into());
    }
}

fn insert_strings(entry: &RawDirectoryEntry, props: &mut Properties, pairs: &[(&str, &str)]) {
    for (attribute, property) in pairs {
        if let Some(value) = entry.get_str(attribute) {
            props.insert(property.to_string(), value.into());
        }
    }
}

/// Directory facets answered from snapshot attributes and indexes.
///
/// Security descriptors, trusts and GPO changes are not parsed here: the
/// snapshot records them as already-decoded JSON attributes (`aces`,
/// `isaclprotected`, `gpochanges`, ...).
pub struct SnapshotDirectory {
    snapshot: Arc<Snapshot>,
}

impl SnapshotDirectory {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    fn principals_for_dns(&self, dns: Vec<String>, attribute: &str, owner: &str) -> Vec<TypedPrincipal> {
        dns.iter()
            .filter_map(|dn| {
                let principal = self.snapshot.principal_for_dn(dn);
                if principal.is_none() {
                    debug!("Unresolved {} reference {} on {}", attribute, dn, owner);
                }
                principal
            })
            .collect()
    }

    fn sid_history(&self, entry: &RawDirectoryEntry) -> Vec<TypedPrincipal> {
        entry
            .get_strings("sidhistory")
            .iter()
            .map(|sid| self.snapshot.principal_for_sid(sid))
            .collect()
    }

    /// Computers named by the host part of delegation SPNs
    fn allowed_to_delegate(&self, entry: &RawDirectoryEntry) -> Vec<TypedPrincipal> {
        let mut targets: Vec<TypedPrincipal> = entry
            .get_strings("msds-allowedtodelegateto")
            .iter()
            .filter_map(|spn| {
                let host = spn.split('/').nth(1)?.split(':').next()?;
                let computer = self.snapshot.by_host(host)?;
                Some(TypedPrincipal::new(object_identifier(computer)?, Label::Computer))
            })
            .collect();
        targets.dedup();
        targets
    }

    fn delegation_props(entry: &RawDirectoryEntry, props: &mut Properties) {
        let delegates = entry.get_strings("msds-allowedtodelegateto");
        if !delegates.is_empty() {
            props.insert("allowedtodelegate".to_string(), delegates.into());
        }
        let sid_history = entry.get_strings("sidhistory");
        props.insert("sidhistory".to_string(), sid_history.into());
    }
}

#[async_trait]
impl DirectoryCollector for SnapshotDirectory {
    async fn acl(&self, req: &FacetRequest<'_>) -> Result<Vec<Ace>> {
        Ok(Snapshot::recorded(req.entry, "aces")?.unwrap_or_default())
    }

    async fn is_acl_protected(&self, req: &FacetRequest<'_>) -> Result<bool> {
        Ok(req.entry.get_bool("isaclprotected").unwrap_or(false))
    }

    async fn inheritance_hashes(&self, req: &FacetRequest<'_>) -> Result<Vec<String>> {
        Ok(req.entry.get_strings("inheritancehashes"))
    }

    async fn gmsa_readers(&self, req: &FacetRequest<'_>) -> Result<Vec<Ace>> {
        Ok(Snapshot::recorded(req.entry, "msds-groupmsamembership")?.unwrap_or_default())
    }

    async fn primary_group_sid(&self, req: &FacetRequest<'_>) -> Result<Option<String>> {
        let rid = req.entry.get_i64("primarygroupid");
        Ok(match (rid, &req.resolved.domain_sid) {
            (Some(rid), Some(domain_sid)) => Some(format!("{}-{}", domain_sid, rid)),
            _ => None,
        })
    }

    async fn group_members(&self, req: &FacetRequest<'_>) -> Result<Vec<TypedPrincipal>> {
        Ok(self.principals_for_dns(req.entry.get_strings("member"), "member", req.entry.key()))
    }

    async fn user_properties(&self, req: &FacetRequest<'_>) -> Result<UserProperties> {
        let entry = req.entry;
        let uac = uac(entry);
        let mut props = common_props(entry);

        let flags = [
            ("enabled", uac & UAC_ACCOUNT_DISABLE == 0),
            ("sensitive", uac & UAC_NOT_DELEGATED != 0),
            ("dontreqpreauth", uac & UAC_DONT_REQUIRE_PREAUTH != 0),
            ("passwordnotreqd", uac & UAC_PASSWORD_NOT_REQUIRED != 0),
            ("unconstraineddelegation", uac & UAC_TRUSTED_FOR_DELEGATION != 0),
            ("pwdneverexpires", uac & UAC_DONT_EXPIRE_PASSWORD != 0),
            ("trustedtoauth", uac & UAC_TRUSTED_TO_AUTH_FOR_DELEGATION != 0),
            ("admincount", is_admin_count(entry)),
        ];
        for (name, value) in flags {
            props.insert(name.to_string(), value.into());
        }
        insert_timestamps(entry, &mut props);
        insert_strings(
            entry,
            &mut props,
            &[
                ("displayname", "displayname"),
                ("mail", "email"),
                ("title", "title"),
                ("homedirectory", "homedirectory"),
                ("scriptpath", "logonscript"),
            ],
        );

        let spns = entry.get_strings("serviceprincipalname");
        props.insert("hasspn".to_string(), (!spns.is_empty()).into());
        props.insert("serviceprincipalnames".to_string(), spns.into());
        Self::delegation_props(entry, &mut props);

        Ok(UserProperties {
            props,
            allowed_to_delegate: self.allowed_to_delegate(entry),
            sid_history: self.sid_history(entry),
            unconstrained_delegation: uac & UAC_TRUSTED_FOR_DELEGATION != 0,
        })
    }

    async fn computer_properties(&self, req: &FacetRequest<'_>) -> Result<ComputerProperties> {
        let entry = req.entry;
        let uac = uac(entry);
        let mut props = common_props(entry);

        props.insert("enabled".to_string(), (uac & UAC_ACCOUNT_DISABLE == 0).into());
        props.insert(
            "unconstraineddelegation".to_string(),
            (uac & UAC_TRUSTED_FOR_DELEGATION != 0).into(),
        );
        props.insert(
            "trustedtoauth".to_string(),
            (uac & UAC_TRUSTED_TO_AUTH_FOR_DELEGATION != 0).into(),
        );
        insert_timestamps(entry, &mut props);

        if let Some(os) = entry.get_str("operatingsystem") {
            let os = match entry.get_str("operatingsystemservicepack") {
                Some(sp) => format!("{} {}", os, sp),
                None => os.to_string(),
            };
            props.insert("operatingsystem".to_string(), os.into());
        }
        props.insert(
            "serviceprincipalnames".to_string(),
            entry.get_strings("serviceprincipalname").into(),
        );
        Self::delegation_props(entry, &mut props);

        let allowed_to_act: Vec<Ace> =
            Snapshot::recorded(entry, "msds-allowedtoactonbehalfofotheridentity")?
                .unwrap_or_default();

        Ok(ComputerProperties {
            props,
            allowed_to_delegate: self.allowed_to_delegate(entry),
            allowed_to_act: allowed_to_act
                .into_iter()
                .map(|ace| TypedPrincipal::new(ace.principal_sid, ace.principal_type))
                .collect(),
            sid_history: self.sid_history(entry),
            dump_smsa_password: self.principals_for_dns(
                entry.get_strings("msds-hostserviceaccount"),
                "msds-hostserviceaccount",
                entry.key(),
            ),
            unconstrained_delegation: uac & UAC_TRUSTED_FOR_DELEGATION != 0,
        })
    }

    async fn group_properties(&self, req: &FacetRequest<'_>) -> Result<GroupProperties> {
        let mut props = common_props(req.entry);
        props.insert("admincount".to_string(), is_admin_count(req.entry).into());
        Ok(GroupProperties {
            props,
            sid_history: self.sid_history(req.entry),
        })
    }

    async fn domain_properties(&self, req: &FacetRequest<'_>) -> Result<Properties> {
        let mut props = common_props(req.entry);
        if let Some(version) = req.entry.get_i64("msds-behavior-version") {
            props.insert("functionallevel".to_string(), functional_level(version).into());
        }
        if let Some(quota) = req.entry.get_i64("ms-ds-machineaccountquota") {
            props.insert("machineaccountquota".to_string(), quota.into());
        }
        Ok(props)
    }

    async fn label_properties(&self, req: &FacetRequest<'_>) -> Result<Properties> {
        let entry = req.entry;
        let mut props = common_props(entry);

        match req.resolved.object_type {
            Label::GPO => {
                if let Some(path) = entry.get_str("gpcfilesyspath") {
                    props.insert("gpcpath".to_string(), path.to_uppercase().into());
                }
            }
            Label::CertTemplate => insert_strings(
                entry,
                &mut props,
                &[
                    ("displayname", "displayname"),
                    ("mspki-cert-template-oid", "oid"),
                    ("mspki-template-schema-version", "schemaversion"),
                ],
            ),
            Label::EnterpriseCA => {
                insert_strings(entry, &mut props, &[("name", "caname"), ("dnshostname", "dnshostname")]);
            }
            Label::RootCA | Label::IntermediateCA => {
                if let Some(thumbprint) = entry.get_str("cacertificate").and_then(cert_thumbprint) {
                    props.insert("certthumbprint".to_string(), thumbprint.into());
                }
            }
            Label::NTAuthStore => {
                let thumbprints: Vec<String> = entry
                    .get_strings("cacertificate")
                    .iter()
                    .filter_map(|cert| cert_thumbprint(cert))
                    .collect();
                props.insert("certthumbprints".to_string(), thumbprints.into());
            }
            _ => {}
        }
        Ok(props)
    }

    async fn issuance_policy_properties(
        &self,
        req: &FacetRequest<'_>,
    ) -> Result<IssuancePolicyProperties> {
        let mut props = common_props(req.entry);
        insert_strings(
            req.entry,
            &mut props,
            &[("displayname", "displayname"), ("mspki-cert-template-oid", "certtemplateoid")],
        );
        let group_link = req
            .entry
            .get_str("msds-oidtogrouplink")
            .and_then(|dn| self.snapshot.principal_for_dn(dn));
        Ok(IssuancePolicyProperties { props, group_link })
    }

    async fn all_properties(&self, req: &FacetRequest<'_>) -> Result<Properties> {
        Ok(req
            .entry
            .attributes
            .iter()
            .filter(|(name, _)| !RECORDED_FACET_ATTRIBUTES.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect())
    }

    async fn spn_targets(&self, req: &FacetRequest<'_>) -> Result<Vec<SpnTarget>> {
        let mut targets = Vec::new();
        for spn in req.entry.get_strings("serviceprincipalname") {
            let Some(caps) = SQL_SPN_PATTERN.captures(&spn) else {
                continue;
            };
            let host = &caps[1];
            let port = caps
                .get(2)
                .and_then(|p| p.as_str().parse().ok())
                .unwrap_or(DEFAULT_SQL_PORT);
            match self.snapshot.by_host(host).and_then(object_identifier) {
                Some(computer_sid) => targets.push(SpnTarget {
                    computer_sid,
                    port,
                    service: "SQLAdmin".to_string(),
                }),
                None => debug!("SPN host {} of {} not in snapshot", host, req.entry.key()),
            }
        }
        Ok(targets)
    }

    async fn containing_object(&self, req: &FacetRequest<'_>) -> Result<Option<TypedPrincipal>> {
        Ok(parent_dn(&req.entry.distinguished_name).and_then(|dn| self.snapshot.principal_for_dn(dn)))
    }

    async fn gp_links(&self, req: &FacetRequest<'_>) -> Result<Vec<GpLink>> {
        let Some(gplink) = req.entry.get_str("gplink") else {
            return Ok(Vec::new());
        };

        let mut links = Vec::new();
        for caps in GPLINK_PATTERN.captures_iter(gplink) {
            let dn = &caps[1];
            let status: u8 = caps[2].parse().unwrap_or(0);
            // Bit 0: link disabled, bit 1: enforced
            if status & 1 != 0 {
                continue;
            }
            let guid = self
                .snapshot
                .by_dn(dn)
                .and_then(object_identifier)
                .or_else(|| GPO_GUID_PATTERN.captures(dn).map(|c| c[1].to_uppercase()));
            match guid {
                Some(guid) => links.push(GpLink {
                    guid,
                    is_enforced: status & 2 != 0,
                }),
                None => warn!("Unparseable gPLink target {} on {}", dn, req.entry.key()),
            }
        }
        Ok(links)
    }

    async fn trusts(&self, req: &FacetRequest<'_>) -> Result<Vec<DomainTrust>> {
        let domain_dn = req.entry.distinguished_name.to_lowercase();
        let system_suffix = format!(",cn=system,{}", domain_dn);

        let trusts = self
            .snapshot
            .entries()
            .iter()
            .filter(|e| {
                e.distinguished_name.to_lowercase().ends_with(&system_suffix)
                    && e.get_strings("objectclass")
                        .iter()
                        .any(|c| c.eq_ignore_ascii_case("trusteddomain"))
            })
            .map(|e| {
                let attributes = e.get_i64("trustattributes").unwrap_or(0);
                let trust_type = if attributes & 0x20 != 0 {
                    "ParentChild"
                } else if attributes & 0x8 != 0 {
                    "Forest"
                } else if attributes & 0x40 != 0 || attributes & 0x4 != 0 {
                    "External"
                } else {
                    "Unknown"
                };
                let direction = match e.get_i64("trustdirection").unwrap_or(0) {
                    1 => "Inbound",
                    2 => "Outbound",
                    3 => "Bidirectional",
                    _ => "Disabled",
                };
                DomainTrust {
                    target_domain_sid: e.get_str("securityidentifier").unwrap_or_default().to_uppercase(),
                    target_domain_name: e.get_str("trustpartner").unwrap_or_default().to_uppercase(),
                    is_transitive: attributes & 0x1 == 0,
                    sid_filtering_enabled: attributes & 0x4 != 0 || attributes & 0x8 != 0,
                    trust_direction: direction.to_string(),
                    trust_type: trust_type.to_string(),
                }
            })
            .collect();
        Ok(trusts)
    }

    async fn gpo_local_groups(&self, req: &FacetRequest<'_>) -> Result<GpoChanges> {
        Ok(Snapshot::recorded(req.entry, "gpochanges")?.unwrap_or_default())
    }

    async fn forest_root_sid(&self, req: &FacetRequest<'_>) -> Result<Option<String>> {
        let own_dn = req.entry.distinguished_name.to_lowercase();
        let root = self
            .snapshot
            .domains()
            .filter(|d| own_dn.ends_with(&d.distinguished_name.to_lowercase()))
            .min_by_key(|d| d.distinguished_name.len());
        Ok(root.and_then(|d| d.get_str("objectsid")).map(str::to_string))
    }

    async fn published_templates(&self, req: &FacetRequest<'_>) -> Result<PublishedTemplates> {
        let mut published = PublishedTemplates::default();
        for name in req.entry.get_strings("certificatetemplates") {
            let template = self.snapshot.entries().iter().find(|e| {
                classify(e) == Label::CertTemplate
                    && e.get_str("name").map_or(false, |n| n.eq_ignore_ascii_case(&name))
            });
            match template.and_then(object_identifier) {
                Some(id) => published
                    .resolved
                    .push(TypedPrincipal::new(id, Label::CertTemplate)),
                None => published.unresolved.push(name),
            }
        }
        Ok(published)
    }

    async fn resolve_host_sid(&self, _req: &FacetRequest<'_>, host: &str) -> Result<Option<String>> {
        Ok(self
            .snapshot
            .by_host(host)
            .and_then(|e| e.get_str("objectsid"))
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    use crate::collectors::context::CollectionContext;
    use crate::collectors::snapshot::fixtures::{contoso, DOMAIN_SID};
    use crate::collectors::snapshot::SnapshotResolver;
    use crate::collectors::traits::Resolver;
    use crate::config::{CollectionMethodSet, CollectorConfig};
    use crate::models::ResolvedResult;
    use crate::test_utils::context_with;

    const CA_DN: &str = "CN=CONTOSO-CA,CN=Enrollment Services,CN=Public Key Services,CN=Services,CN=Configuration,DC=contoso,DC=local";

    async fn fixture(
        snapshot: &Arc<Snapshot>,
        dn: &str,
    ) -> (RawDirectoryEntry, ResolvedResult, CollectionContext) {
        let entry = snapshot.by_dn(dn).unwrap().clone();
        let resolved = SnapshotResolver::new(snapshot.clone())
            .resolve(&entry)
            .await
            .unwrap()
            .unwrap();
        let ctx = context_with(CollectionMethodSet::all(), CollectorConfig::default());
        (entry, resolved, ctx)
    }

    #[test]
    fn test_parent_dn_handles_escapes() {
        assert_eq!(parent_dn("CN=Smith\\, John,CN=Users,DC=x"), Some("CN=Users,DC=x"));
        assert_eq!(parent_dn("DC=x"), None);
    }

    #[tokio::test]
    async fn test_user_facets() {
        let snapshot = Arc::new(contoso());
        let directory = SnapshotDirectory::new(snapshot.clone());
        let (entry, resolved, ctx) =
            fixture(&snapshot, "CN=Alice,CN=Users,DC=contoso,DC=local").await;
        let req = FacetRequest::new(&resolved, &entry, &ctx);

        let props = directory.user_properties(&req).await.unwrap();
        assert_eq!(props.props["enabled"], Value::Bool(true));
        assert_eq!(props.props["hasspn"], Value::Bool(true));
        assert_eq!(props.props["pwdlastset"], Value::from(1_655_526_400i64));

        assert_eq!(
            directory.primary_group_sid(&req).await.unwrap(),
            Some(format!("{}-513", DOMAIN_SID))
        );

        let spns = directory.spn_targets(&req).await.unwrap();
        assert_eq!(spns.len(), 1);
        assert_eq!(spns[0].port, 1433);
        assert_eq!(spns[0].computer_sid, format!("{}-1105", DOMAIN_SID));

        let parent = directory.containing_object(&req).await.unwrap();
        assert_eq!(parent.map(|p| p.object_type), Some(Label::Container));
    }

    #[tokio::test]
    async fn test_members_skip_unknown_dns() {
        let snapshot = Arc::new(contoso());
        let directory = SnapshotDirectory::new(snapshot.clone());
        let (entry, resolved, ctx) =
            fixture(&snapshot, "CN=Domain Admins,CN=Users,DC=contoso,DC=local").await;
        let req = FacetRequest::new(&resolved, &entry, &ctx);

        let members = directory.group_members(&req).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].object_type, Label::User);
    }

    #[tokio::test]
    async fn test_domain_links_and_root() {
        let snapshot = Arc::new(contoso());
        let directory = SnapshotDirectory::new(snapshot.clone());
        let (entry, resolved, ctx) = fixture(&snapshot, "DC=contoso,DC=local").await;
        let req = FacetRequest::new(&resolved, &entry, &ctx);

        let links = directory.gp_links(&req).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].guid, "31B2F340-016D-11D2-945F-00C04FB984F9");
        assert!(!links[0].is_enforced);
        assert_eq!(
            directory.forest_root_sid(&req).await.unwrap().as_deref(),
            Some(DOMAIN_SID)
        );
        let props = directory.domain_properties(&req).await.unwrap();
        assert_eq!(props["functionallevel"], Value::from("2016"));
    }

    #[tokio::test]
    async fn test_published_templates() {
        let snapshot = Arc::new(contoso());
        let directory = SnapshotDirectory::new(snapshot.clone());
        let (entry, resolved, ctx) = fixture(&snapshot, CA_DN).await;
        let req = FacetRequest::new(&resolved, &entry, &ctx);

        let published = directory.published_templates(&req).await.unwrap();
        assert_eq!(published.resolved.len(), 1);
        assert_eq!(published.unresolved, vec!["Retired".to_string()]);
        assert_eq!(
            directory
                .resolve_host_sid(&req, "sql01.contoso.local")
                .await
                .unwrap(),
            Some(format!("{}-1105", DOMAIN_SID))
        );
    }

    #[test]
    fn test_cert_thumbprint() {
        let encoded = STANDARD.encode(b"certificate bytes");
        let thumbprint = cert_thumbprint(&encoded).unwrap();
        assert_eq!(thumbprint.len(), 64);
        assert!(thumbprint
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert!(cert_thumbprint("not base64!").is_none());
    }
}
