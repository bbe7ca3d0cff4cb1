//! Test utilities for rust-ad-collector
//!
//! Fixture entries, a deterministic resolver and in-memory fakes for every
//! collaborator trait, shared by the pipeline unit tests.

#![cfg(test)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::collectors::context::CollectionContext;
use crate::collectors::traits::{
    AvailabilityProbe, DirectoryCollector, Facet, FacetRequest, HostCollector, Producer,
    Resolver, WellKnownCatalog,
};
use crate::config::{CollectionMethodSet, CollectorConfig};
use crate::constants::{AUTHENTICATED_USERS_SID, EVERYONE_SID, UAC_SERVER_TRUST_ACCOUNT};
use crate::models::output::{
    Ace, ApiResult, BaseRecord, CaRegistryData, ComputerProperties, ComputerStatus,
    DcRegistryData, DomainTrust, EnrollmentEndpoint, GpLink, GpoChanges, Group,
    GroupProperties, IssuancePolicyProperties, LdapServices, LocalGroupResult,
    NtlmRegistryData, OutputRecord, Properties, PublishedTemplates, Session, SessionApiResult,
    SmbInfo, SpnTarget, TypedPrincipal, UserProperties, UserRightsResult,
};
use crate::models::{Label, RawDirectoryEntry, ResolvedResult};
use crate::pipeline::queue::WorkQueueWriter;
use crate::pipeline::sink::{SinkSender, SinkWriter};

pub const TEST_DOMAIN: &str = "CONTOSO.LOCAL";
pub const TEST_DOMAIN_SID: &str = "S-1-5-21-1-2-3";

/// Context over `config` with an explicit method set
pub fn context_with(methods: CollectionMethodSet, config: CollectorConfig) -> CollectionContext {
    CollectionContext::new(Arc::new(config), methods)
}

/// Plain user entry under `CN=Users`
pub fn user_entry(name: &str) -> RawDirectoryEntry {
    RawDirectoryEntry::new(format!("CN={},CN=Users,DC=contoso,DC=local", name))
        .with_attribute("objectClass", json!(["top", "person", "user"]))
        .with_attribute("sAMAccountName", name)
        .with_attribute("userAccountControl", 512)
}

/// Computer entry, flagged as a domain controller when `is_dc` is set
pub fn computer_entry(name: &str, is_dc: bool) -> RawDirectoryEntry {
    let (ou, uac) = if is_dc {
        ("OU=Domain Controllers", 0x1000 | UAC_SERVER_TRUST_ACCOUNT)
    } else {
        ("CN=Computers", 0x1000)
    };
    RawDirectoryEntry::new(format!("CN={},{},DC=contoso,DC=local", name, ou))
        .with_attribute("objectClass", json!(["top", "person", "user", "computer"]))
        .with_attribute("sAMAccountName", format!("{}$", name))
        .with_attribute("dNSHostName", format!("{}.contoso.local", name))
        .with_attribute("userAccountControl", uac)
        .with_attribute("operatingSystem", "Windows Server 2022 Standard")
}

/// Deterministic resolution of `entry` as `label`
pub fn resolved_for(entry: &RawDirectoryEntry, label: Label) -> ResolvedResult {
    let name = entry
        .get_str("samaccountname")
        .map(|s| s.trim_end_matches('$').to_string())
        .unwrap_or_else(|| first_rdn_value(&entry.distinguished_name))
        .to_uppercase();

    let display_name = match label {
        Label::Computer => format!("{}.{}", name, TEST_DOMAIN),
        Label::Domain => TEST_DOMAIN.to_string(),
        _ => format!("{}@{}", name, TEST_DOMAIN),
    };
    let object_id = match label {
        Label::Domain => TEST_DOMAIN_SID.to_string(),
        _ => format!("{}-{}", TEST_DOMAIN_SID, rid_for(&entry.distinguished_name)),
    };
    let is_domain_controller = entry
        .get_i64("useraccountcontrol")
        .map_or(false, |uac| uac & UAC_SERVER_TRUST_ACCOUNT != 0);

    ResolvedResult {
        object_type: label,
        display_name,
        domain: TEST_DOMAIN.to_string(),
        domain_sid: Some(TEST_DOMAIN_SID.to_string()),
        object_id,
        is_domain_controller,
    }
}

fn first_rdn_value(dn: &str) -> String {
    dn.split(',')
        .next()
        .and_then(|rdn| rdn.split_once('='))
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}

fn rid_for(dn: &str) -> u32 {
    let hash = dn
        .to_lowercase()
        .bytes()
        .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    1100 + hash % 100_000
}

/// Status sender whose events are read straight from the receiver
pub fn status_channel<T>() -> (SinkSender<T>, mpsc::UnboundedReceiver<T>) {
    SinkSender::detached()
}

/// Everything currently buffered in `rx`
pub fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}

/// Directory facets answered from the entry itself
#[derive(Default)]
pub struct FakeDirectory {
    failing: HashSet<Facet>,
}

impl FakeDirectory {
    pub fn failing(mut self, facet: Facet) -> Self {
        self.failing.insert(facet);
        self
    }

    fn check(&self, facet: Facet) -> Result<()> {
        if self.failing.contains(&facet) {
            bail!("{} lookup failed", facet);
        }
        Ok(())
    }
}

fn enabled_props() -> Properties {
    let mut props = Properties::new();
    props.insert("enabled".to_string(), Value::Bool(true));
    props
}

#[async_trait]
impl DirectoryCollector for FakeDirectory {
    async fn acl(&self, _req: &FacetRequest<'_>) -> Result<Vec<Ace>> {
        self.check(Facet::Acl)?;
        Ok(vec![Ace {
            principal_sid: format!("{}-512", TEST_DOMAIN_SID),
            principal_type: Label::Group,
            right_name: "GenericAll".to_string(),
            is_inherited: false,
        }])
    }

    async fn is_acl_protected(&self, _req: &FacetRequest<'_>) -> Result<bool> {
        self.check(Facet::AclProtection)?;
        Ok(false)
    }

    async fn inheritance_hashes(&self, _req: &FacetRequest<'_>) -> Result<Vec<String>> {
        self.check(Facet::InheritanceHashes)?;
        Ok(Vec::new())
    }

    async fn gmsa_readers(&self, _req: &FacetRequest<'_>) -> Result<Vec<Ace>> {
        self.check(Facet::GmsaReaders)?;
        Ok(Vec::new())
    }

    async fn primary_group_sid(&self, _req: &FacetRequest<'_>) -> Result<Option<String>> {
        self.check(Facet::PrimaryGroup)?;
        Ok(Some(format!("{}-513", TEST_DOMAIN_SID)))
    }

    async fn group_members(&self, _req: &FacetRequest<'_>) -> Result<Vec<TypedPrincipal>> {
        self.check(Facet::Members)?;
        Ok(Vec::new())
    }

    async fn user_properties(&self, _req: &FacetRequest<'_>) -> Result<UserProperties> {
        self.check(Facet::Properties)?;
        Ok(UserProperties {
            props: enabled_props(),
            ..Default::default()
        })
    }

    async fn computer_properties(&self, _req: &FacetRequest<'_>) -> Result<ComputerProperties> {
        self.check(Facet::Properties)?;
        Ok(ComputerProperties {
            props: enabled_props(),
            ..Default::default()
        })
    }

    async fn group_properties(&self, _req: &FacetRequest<'_>) -> Result<GroupProperties> {
        self.check(Facet::Properties)?;
        Ok(GroupProperties::default())
    }

    async fn domain_properties(&self, _req: &FacetRequest<'_>) -> Result<Properties> {
        self.check(Facet::Properties)?;
        Ok(Properties::new())
    }

    async fn label_properties(&self, _req: &FacetRequest<'_>) -> Result<Properties> {
        self.check(Facet::Properties)?;
        Ok(Properties::new())
    }

    async fn issuance_policy_properties(
        &self,
        req: &FacetRequest<'_>,
    ) -> Result<IssuancePolicyProperties> {
        self.check(Facet::Properties)?;
        Ok(IssuancePolicyProperties {
            props: Properties::new(),
            group_link: req
                .entry
                .get_str("msds-oidtogrouplink")
                .map(|dn| TypedPrincipal::new(format!("{}-{}", TEST_DOMAIN_SID, rid_for(dn)), Label::Group)),
        })
    }

    async fn all_properties(&self, req: &FacetRequest<'_>) -> Result<Properties> {
        self.check(Facet::AllProperties)?;
        Ok(req
            .entry
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn spn_targets(&self, _req: &FacetRequest<'_>) -> Result<Vec<SpnTarget>> {
        self.check(Facet::SpnTargets)?;
        Ok(Vec::new())
    }

    async fn containing_object(&self, _req: &FacetRequest<'_>) -> Result<Option<TypedPrincipal>> {
        self.check(Facet::ContainedBy)?;
        Ok(Some(TypedPrincipal::new(
            "AB12CD34-0000-0000-0000-000000000001",
            Label::Container,
        )))
    }

    async fn gp_links(&self, _req: &FacetRequest<'_>) -> Result<Vec<GpLink>> {
        self.check(Facet::GpLinks)?;
        Ok(Vec::new())
    }

    async fn trusts(&self, _req: &FacetRequest<'_>) -> Result<Vec<DomainTrust>> {
        self.check(Facet::Trusts)?;
        Ok(Vec::new())
    }

    async fn gpo_local_groups(&self, _req: &FacetRequest<'_>) -> Result<GpoChanges> {
        self.check(Facet::GpoLocalGroups)?;
        Ok(GpoChanges::default())
    }

    async fn forest_root_sid(&self, _req: &FacetRequest<'_>) -> Result<Option<String>> {
        self.check(Facet::ForestRoot)?;
        Ok(Some(TEST_DOMAIN_SID.to_string()))
    }

    async fn published_templates(&self, req: &FacetRequest<'_>) -> Result<PublishedTemplates> {
        self.check(Facet::PublishedTemplates)?;
        let mut published = PublishedTemplates::default();
        for name in req.entry.get_strings("certificatetemplates") {
            if name == "User" {
                published.resolved.push(TypedPrincipal::new(
                    "AB12CD34-0000-0000-0000-00000000USER",
                    Label::CertTemplate,
                ));
            } else {
                published.unresolved.push(name);
            }
        }
        Ok(published)
    }

    async fn resolve_host_sid(&self, _req: &FacetRequest<'_>, _host: &str) -> Result<Option<String>> {
        self.check(Facet::HostingComputer)?;
        Ok(Some(format!("{}-1105", TEST_DOMAIN_SID)))
    }
}

/// Host facets that always succeed unless told to fail, counting every call
#[derive(Default)]
pub struct FakeHosts {
    failing: HashSet<Facet>,
    calls: Arc<AtomicUsize>,
}

impl FakeHosts {
    pub fn failing(mut self, facet: Facet) -> Self {
        self.failing.insert(facet);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    fn check(&self, facet: Facet) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&facet) {
            bail!("{} RPC failed", facet);
        }
        Ok(())
    }

    fn session(&self, req: &FacetRequest<'_>) -> SessionApiResult {
        ApiResult::collected(vec![Session {
            computer_sid: req.resolved.object_id.clone(),
            user_sid: format!("{}-1104", TEST_DOMAIN_SID),
        }])
    }
}

#[async_trait]
impl HostCollector for FakeHosts {
    async fn sessions(&self, req: &FacetRequest<'_>) -> Result<SessionApiResult> {
        self.check(Facet::Sessions)?;
        Ok(self.session(req))
    }

    async fn privileged_sessions(&self, req: &FacetRequest<'_>) -> Result<SessionApiResult> {
        self.check(Facet::PrivilegedSessions)?;
        Ok(self.session(req))
    }

    async fn registry_sessions(&self, req: &FacetRequest<'_>) -> Result<SessionApiResult> {
        self.check(Facet::RegistrySessions)?;
        Ok(self.session(req))
    }

    async fn user_rights(&self, _req: &FacetRequest<'_>) -> Result<Vec<UserRightsResult>> {
        self.check(Facet::UserRights)?;
        Ok(Vec::new())
    }

    async fn ntlm_registry(&self, _req: &FacetRequest<'_>) -> Result<ApiResult<NtlmRegistryData>> {
        self.check(Facet::NtlmRegistry)?;
        Ok(ApiResult::collected(NtlmRegistryData::default()))
    }

    async fn web_client_running(&self, _req: &FacetRequest<'_>) -> Result<ApiResult<bool>> {
        self.check(Facet::WebClient)?;
        Ok(ApiResult::collected(false))
    }

    async fn smb_info(&self, _req: &FacetRequest<'_>) -> Result<ApiResult<SmbInfo>> {
        self.check(Facet::SmbInfo)?;
        Ok(ApiResult::collected(SmbInfo::default()))
    }

    async fn local_groups(&self, _req: &FacetRequest<'_>) -> Result<Vec<LocalGroupResult>> {
        self.check(Facet::LocalGroups)?;
        Ok(Vec::new())
    }

    async fn dc_registry(&self, _req: &FacetRequest<'_>) -> Result<DcRegistryData> {
        self.check(Facet::DcRegistry)?;
        Ok(DcRegistryData::default())
    }

    async fn ldap_services(&self, _req: &FacetRequest<'_>) -> Result<LdapServices> {
        self.check(Facet::LdapServices)?;
        Ok(LdapServices {
            has_ldap: true,
            has_ldaps: false,
            is_signing_required: Some(true),
            is_channel_binding_disabled: None,
        })
    }

    async fn ca_registry(&self, _req: &FacetRequest<'_>, _host: &str) -> Result<CaRegistryData> {
        self.check(Facet::CaRegistry)?;
        Ok(CaRegistryData {
            ca_security: ApiResult::collected(Vec::new()),
            enrollment_agent_restrictions: ApiResult::collected(Vec::new()),
            is_user_specifies_san_enabled: ApiResult::collected(false),
            role_separation_enabled: ApiResult::collected(false),
        })
    }

    async fn enrollment_endpoints(
        &self,
        _req: &FacetRequest<'_>,
        host: &str,
    ) -> Result<Vec<EnrollmentEndpoint>> {
        self.check(Facet::EnrollmentEndpoints)?;
        Ok(vec![EnrollmentEndpoint {
            url: format!("http://{}/certsrv/", host),
            ntlm_enabled: true,
        }])
    }
}

/// Probe with a fixed answer
pub struct FakeProbe {
    status: ComputerStatus,
}

impl FakeProbe {
    pub fn connectable() -> Self {
        Self {
            status: ComputerStatus::connectable(),
        }
    }

    pub fn unreachable(reason: &str) -> Self {
        Self {
            status: ComputerStatus::unreachable(reason),
        }
    }
}

#[async_trait]
impl AvailabilityProbe for FakeProbe {
    async fn availability(&self, _req: &FacetRequest<'_>) -> ComputerStatus {
        self.status.clone()
    }
}

/// Resolver classifying entries by their `objectClass`
pub struct FakeResolver;

#[async_trait]
impl Resolver for FakeResolver {
    async fn resolve(&self, entry: &RawDirectoryEntry) -> Result<Option<ResolvedResult>> {
        let classes: Vec<String> = entry
            .get_strings("objectclass")
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect();
        let has = |name: &str| classes.iter().any(|c| c == name);

        let label = if has("computer") {
            Label::Computer
        } else if has("user") {
            Label::User
        } else if has("group") {
            Label::Group
        } else if has("domaindns") {
            Label::Domain
        } else if has("organizationalunit") {
            Label::OU
        } else if has("grouppolicycontainer") {
            Label::GPO
        } else if has("pkienrollmentservice") {
            Label::EnterpriseCA
        } else if has("pkicertificatetemplate") {
            Label::CertTemplate
        } else if has("container") {
            Label::Container
        } else {
            Label::Base
        };
        Ok(Some(resolved_for(entry, label)))
    }
}

/// Producer replaying two fixed partitions and recording the call order
pub struct FakeProducer {
    primary: Vec<RawDirectoryEntry>,
    secondary: Vec<RawDirectoryEntry>,
    fail_primary: bool,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl FakeProducer {
    pub fn new(primary: Vec<RawDirectoryEntry>, secondary: Vec<RawDirectoryEntry>) -> Self {
        Self {
            primary,
            secondary,
            fail_primary: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue the primary entries, then report an error
    pub fn failing_primary(mut self) -> Self {
        self.fail_primary = true;
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<&'static str>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Producer for FakeProducer {
    async fn produce(
        &self,
        queue: &WorkQueueWriter<RawDirectoryEntry>,
        _ctx: &CollectionContext,
    ) -> Result<usize> {
        self.record("produce:start");
        for entry in &self.primary {
            queue.put(entry.clone()).await?;
        }
        self.record("produce:end");
        if self.fail_primary {
            bail!("directory search aborted");
        }
        Ok(self.primary.len())
    }

    async fn produce_secondary_partition(
        &self,
        queue: &WorkQueueWriter<RawDirectoryEntry>,
        _ctx: &CollectionContext,
    ) -> Result<usize> {
        self.record("secondary:start");
        for entry in &self.secondary {
            queue.put(entry.clone()).await?;
        }
        self.record("secondary:end");
        Ok(self.secondary.len())
    }
}

/// Well-known catalog with a fixed set of groups
pub struct StaticCatalog {
    principals: Vec<OutputRecord>,
}

impl StaticCatalog {
    pub fn empty() -> Self {
        Self {
            principals: Vec::new(),
        }
    }

    /// Everyone, Authenticated Users and Enterprise Domain Controllers for
    /// `domain`, each with members
    pub fn for_domain(domain: &str, dc_sids: &[&str]) -> Self {
        let dcs: Vec<TypedPrincipal> = dc_sids
            .iter()
            .map(|sid| TypedPrincipal::new(*sid, Label::Computer))
            .collect();
        let everyone = vec![TypedPrincipal::new(
            format!("{}-{}", domain, AUTHENTICATED_USERS_SID),
            Label::Group,
        )];

        let group = |sid: &str, name: &str, members: Vec<TypedPrincipal>| {
            let mut props = Properties::new();
            props.insert("name".to_string(), format!("{}@{}", name, domain).into());
            props.insert("domain".to_string(), domain.into());
            OutputRecord::Group(Group {
                base: BaseRecord::new(format!("{}-{}", domain, sid), props),
                members: Some(members),
                ..Default::default()
            })
        };

        Self {
            principals: vec![
                group(EVERYONE_SID, "EVERYONE", everyone),
                group(AUTHENTICATED_USERS_SID, "AUTHENTICATED USERS", dcs.clone()),
                group("S-1-5-9", "ENTERPRISE DOMAIN CONTROLLERS", dcs),
            ],
        }
    }
}

impl WellKnownCatalog for StaticCatalog {
    fn principals(&self) -> Result<Vec<OutputRecord>> {
        Ok(self.principals.clone())
    }
}

/// Sink writer collecting items in memory
pub struct MemoryWriter<T> {
    items: Arc<Mutex<Vec<T>>>,
    finished: Arc<AtomicBool>,
    fail_finish: bool,
}

impl<T> Default for MemoryWriter<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
            finished: Arc::new(AtomicBool::new(false)),
            fail_finish: false,
        }
    }
}

impl<T> MemoryWriter<T> {
    /// Writer whose `finish` reports an error after being called
    pub fn failing_finish() -> Self {
        Self {
            fail_finish: true,
            ..Self::default()
        }
    }

    pub fn items(&self) -> Arc<Mutex<Vec<T>>> {
        Arc::clone(&self.items)
    }

    pub fn finished(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finished)
    }
}

impl<T: Send + 'static> SinkWriter<T> for MemoryWriter<T> {
    fn write(&mut self, item: T) -> Result<()> {
        self.items.lock().unwrap().push(item);
        Ok(())
    }

    fn finish(self) -> Result<PathBuf> {
        self.finished.store(true, Ordering::SeqCst);
        if self.fail_finish {
            bail!("disk full");
        }
        Ok(PathBuf::from("memory"))
    }
}
