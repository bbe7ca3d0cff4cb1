use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::collectors::snapshot::Snapshot;
use crate::collectors::traits::{FacetRequest, HostCollector};
use crate::models::output::{
    ApiResult, CaRegistryData, DcRegistryData, EnrollmentEndpoint, LdapServices,
    LocalGroupResult, NtlmRegistryData, SessionApiResult, SmbInfo, UserRightsResult,
};
use crate::models::RawDirectoryEntry;

/// Host facets replayed from the `hostdata` attribute of computer entries.
///
/// `hostdata` is a JSON object keyed by facet (`sessions`, `localgroups`,
/// `ldapservices`, ...) holding values in the output record format. A key
/// that was not recorded fails the facet, the same way an unreachable RPC
/// endpoint would.
pub struct SnapshotHosts {
    snapshot: Arc<Snapshot>,
}

impl SnapshotHosts {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    fn replay<T: DeserializeOwned>(entry: &RawDirectoryEntry, host: &str, key: &str) -> Result<T> {
        let value = entry
            .attribute("hostdata")
            .and_then(|data| data.get(key))
            .filter(|v| !v.is_null())
            .ok_or_else(|| anyhow!("no recorded {} data for {}", key, host))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("Malformed recorded {} data for {}", key, host))
    }

    fn computer<T: DeserializeOwned>(req: &FacetRequest<'_>, key: &str) -> Result<T> {
        Self::replay(req.entry, &req.api_name(), key)
    }

    /// Data recorded for a named host, falling back to the requesting entry
    fn remote<T: DeserializeOwned>(&self, req: &FacetRequest<'_>, host: &str, key: &str) -> Result<T> {
        let entry = self
            .snapshot
            .by_host(host)
            .filter(|e| {
                e.attribute("hostdata")
                    .and_then(|data| data.get(key))
                    .map_or(false, |v| !v.is_null())
            })
            .unwrap_or(req.entry);
        Self::replay(entry, host, key)
    }
}

#[async_trait]
impl HostCollector for SnapshotHosts {
    async fn sessions(&self, req: &FacetRequest<'_>) -> Result<SessionApiResult> {
        Self::computer(req, "sessions")
    }

    async fn privileged_sessions(&self, req: &FacetRequest<'_>) -> Result<SessionApiResult> {
        Self::computer(req, "privilegedsessions")
    }

    async fn registry_sessions(&self, req: &FacetRequest<'_>) -> Result<SessionApiResult> {
        Self::computer(req, "registrysessions")
    }

    async fn user_rights(&self, req: &FacetRequest<'_>) -> Result<Vec<UserRightsResult>> {
        Self::computer(req, "userrights")
    }

    async fn ntlm_registry(&self, req: &FacetRequest<'_>) -> Result<ApiResult<NtlmRegistryData>> {
        Self::computer(req, "ntlmregistry")
    }

    async fn web_client_running(&self, req: &FacetRequest<'_>) -> Result<ApiResult<bool>> {
        Self::computer(req, "webclient")
    }

    async fn smb_info(&self, req: &FacetRequest<'_>) -> Result<ApiResult<SmbInfo>> {
        Self::computer(req, "smbinfo")
    }

    async fn local_groups(&self, req: &FacetRequest<'_>) -> Result<Vec<LocalGroupResult>> {
        Self::computer(req, "localgroups")
    }

    async fn dc_registry(&self, req: &FacetRequest<'_>) -> Result<DcRegistryData> {
        Self::computer(req, "dcregistry")
    }

    async fn ldap_services(&self, req: &FacetRequest<'_>) -> Result<LdapServices> {
        Self::computer(req, "ldapservices")
    }

    async fn ca_registry(&self, req: &FacetRequest<'_>, host: &str) -> Result<CaRegistryData> {
        self.remote(req, host, "caregistry")
    }

    async fn enrollment_endpoints(
        &self,
        req: &FacetRequest<'_>,
        host: &str,
    ) -> Result<Vec<EnrollmentEndpoint>> {
        self.remote(req, host, "enrollmentendpoints")
    }
}
