//! Collaborator seams of the pipeline.
//!
//! The pipeline only talks to directory and host data through these traits.
//! Every facet call may fail; callers decide whether that degrades a record or
//! aborts an item.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::collectors::context::CollectionContext;
use crate::models::output::{
    Ace, ApiResult, CaRegistryData, ComputerProperties, ComputerStatus, DcRegistryData,
    DomainTrust, EnrollmentEndpoint, GpLink, GpoChanges, GroupProperties,
    IssuancePolicyProperties, LdapServices, LocalGroupResult, NtlmRegistryData, OutputRecord,
    Properties, PublishedTemplates, SessionApiResult, SmbInfo, SpnTarget, TypedPrincipal,
    UserProperties, UserRightsResult,
};
use crate::models::{RawDirectoryEntry, ResolvedResult};
use crate::pipeline::queue::WorkQueueWriter;

/// Everything a facet call may look at for one item
#[derive(Clone, Copy)]
pub struct FacetRequest<'a> {
    pub resolved: &'a ResolvedResult,
    pub entry: &'a RawDirectoryEntry,
    pub ctx: &'a CollectionContext,
}

impl<'a> FacetRequest<'a> {
    pub fn new(
        resolved: &'a ResolvedResult,
        entry: &'a RawDirectoryEntry,
        ctx: &'a CollectionContext,
    ) -> Self {
        Self { resolved, entry, ctx }
    }

    /// Name used to reach the host: the DNS host name when `real_dns_name` is
    /// set and recorded, the resolved display name otherwise
    pub fn api_name(&self) -> String {
        if self.ctx.config.real_dns_name {
            if let Some(dns) = self.entry.get_str("dnshostname") {
                return dns.to_string();
            }
        }
        self.resolved.display_name.clone()
    }
}

/// Names one facet of an object, for logs and status events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Acl,
    AclProtection,
    InheritanceHashes,
    GmsaReaders,
    PrimaryGroup,
    Members,
    Properties,
    AllProperties,
    SpnTargets,
    ContainedBy,
    GpLinks,
    Trusts,
    GpoLocalGroups,
    ForestRoot,
    PublishedTemplates,
    HostingComputer,
    Sessions,
    PrivilegedSessions,
    RegistrySessions,
    UserRights,
    NtlmRegistry,
    WebClient,
    SmbInfo,
    LocalGroups,
    DcRegistry,
    LdapServices,
    CaRegistry,
    EnrollmentEndpoints,
}

impl Facet {
    /// Task name recorded in computer status events
    pub fn task_name(&self) -> &'static str {
        match self {
            Facet::Sessions => "NetSessionEnum",
            Facet::PrivilegedSessions => "NetWkstaUserEnum",
            Facet::RegistrySessions => "RegistrySessions",
            Facet::UserRights => "LSAEnumerateAccountsWithUserRights",
            Facet::NtlmRegistry => "NTLMRegistryData",
            Facet::WebClient => "WebClientService",
            Facet::SmbInfo => "SmbInfo",
            Facet::LocalGroups => "LocalGroups",
            Facet::DcRegistry => "DCRegistryData",
            Facet::LdapServices => "LdapServices",
            Facet::CaRegistry => "CARegistryData",
            Facet::EnrollmentEndpoints => "EnrollmentEndpoints",
            Facet::HostingComputer => "CAHostingComputer",
            _ => "Directory",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Turns a raw entry into a typed view. `Ok(None)` means "not resolvable".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, entry: &RawDirectoryEntry) -> Result<Option<ResolvedResult>>;
}

/// Facets answered by the directory itself
#[async_trait]
pub trait DirectoryCollector: Send + Sync {
    async fn acl(&self, req: &FacetRequest<'_>) -> Result<Vec<Ace>>;
    async fn is_acl_protected(&self, req: &FacetRequest<'_>) -> Result<bool>;
    async fn inheritance_hashes(&self, req: &FacetRequest<'_>) -> Result<Vec<String>>;
    async fn gmsa_readers(&self, req: &FacetRequest<'_>) -> Result<Vec<Ace>>;
    async fn primary_group_sid(&self, req: &FacetRequest<'_>) -> Result<Option<String>>;
    async fn group_members(&self, req: &FacetRequest<'_>) -> Result<Vec<TypedPrincipal>>;

    async fn user_properties(&self, req: &FacetRequest<'_>) -> Result<UserProperties>;
    async fn computer_properties(&self, req: &FacetRequest<'_>) -> Result<ComputerProperties>;
    async fn group_properties(&self, req: &FacetRequest<'_>) -> Result<GroupProperties>;
    async fn domain_properties(&self, req: &FacetRequest<'_>) -> Result<Properties>;
    /// Properties for the remaining types (OU, GPO, Container, CA family)
    async fn label_properties(&self, req: &FacetRequest<'_>) -> Result<Properties>;
    async fn issuance_policy_properties(
        &self,
        req: &FacetRequest<'_>,
    ) -> Result<IssuancePolicyProperties>;
    /// Every raw attribute as a property bag
    async fn all_properties(&self, req: &FacetRequest<'_>) -> Result<Properties>;

    async fn spn_targets(&self, req: &FacetRequest<'_>) -> Result<Vec<SpnTarget>>;
    async fn containing_object(&self, req: &FacetRequest<'_>) -> Result<Option<TypedPrincipal>>;
    async fn gp_links(&self, req: &FacetRequest<'_>) -> Result<Vec<GpLink>>;
    async fn trusts(&self, req: &FacetRequest<'_>) -> Result<Vec<DomainTrust>>;
    async fn gpo_local_groups(&self, req: &FacetRequest<'_>) -> Result<GpoChanges>;
    async fn forest_root_sid(&self, req: &FacetRequest<'_>) -> Result<Option<String>>;
    async fn published_templates(&self, req: &FacetRequest<'_>) -> Result<PublishedTemplates>;
    /// Resolve a host name to the SID of its computer object
    async fn resolve_host_sid(&self, req: &FacetRequest<'_>, host: &str) -> Result<Option<String>>;
}

/// Facets that require talking to a host over the network
#[async_trait]
pub trait HostCollector: Send + Sync {
    async fn sessions(&self, req: &FacetRequest<'_>) -> Result<SessionApiResult>;
    async fn privileged_sessions(&self, req: &FacetRequest<'_>) -> Result<SessionApiResult>;
    async fn registry_sessions(&self, req: &FacetRequest<'_>) -> Result<SessionApiResult>;
    async fn user_rights(&self, req: &FacetRequest<'_>) -> Result<Vec<UserRightsResult>>;
    async fn ntlm_registry(&self, req: &FacetRequest<'_>) -> Result<ApiResult<NtlmRegistryData>>;
    async fn web_client_running(&self, req: &FacetRequest<'_>) -> Result<ApiResult<bool>>;
    async fn smb_info(&self, req: &FacetRequest<'_>) -> Result<ApiResult<SmbInfo>>;
    async fn local_groups(&self, req: &FacetRequest<'_>) -> Result<Vec<LocalGroupResult>>;
    async fn dc_registry(&self, req: &FacetRequest<'_>) -> Result<DcRegistryData>;
    async fn ldap_services(&self, req: &FacetRequest<'_>) -> Result<LdapServices>;
    async fn ca_registry(&self, req: &FacetRequest<'_>, host: &str) -> Result<CaRegistryData>;
    async fn enrollment_endpoints(
        &self,
        req: &FacetRequest<'_>,
        host: &str,
    ) -> Result<Vec<EnrollmentEndpoint>>;
}

/// Reachability gate run before any host facet of a computer
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    async fn availability(&self, req: &FacetRequest<'_>) -> ComputerStatus;
}

/// Fixed set of synthesized principals injected after normal processing
pub trait WellKnownCatalog: Send + Sync {
    fn principals(&self) -> Result<Vec<OutputRecord>>;
}

/// Enumeration strategy filling the work queue in two sequential phases
#[async_trait]
pub trait Producer: Send + Sync {
    /// Primary partition. Returns the number of entries queued.
    async fn produce(
        &self,
        queue: &WorkQueueWriter<RawDirectoryEntry>,
        ctx: &CollectionContext,
    ) -> Result<usize>;

    /// Secondary (configuration) partition, run after `produce` finished
    async fn produce_secondary_partition(
        &self,
        queue: &WorkQueueWriter<RawDirectoryEntry>,
        ctx: &CollectionContext,
    ) -> Result<usize>;
}
