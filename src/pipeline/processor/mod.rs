//! Per-type object processing.
//!
//! [`ObjectProcessor::process`] dispatches a resolved entry to the builder for
//! its label. Each builder sets the common header, then asks the collaborators
//! for every facet its [`FacetGates`] enable. A failing facet is logged with the
//! object and facet names and simply left out of the record.

mod cert;
mod computer;
mod gates;
mod principals;

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, warn};
use serde_json::Value;

use crate::collectors::context::CollectionContext;
use crate::collectors::traits::{
    AvailabilityProbe, DirectoryCollector, Facet, FacetRequest, HostCollector,
};
use crate::constants::STATUS_CANCELLED;
use crate::models::output::{Ace, BaseRecord, OutputRecord, Properties, TypedPrincipal};
use crate::models::{ComputerStatusEvent, Label, RawDirectoryEntry, ResolvedResult};
use crate::pipeline::sink::SinkSender;

pub use gates::FacetGates;

/// Builds typed output records from resolved entries
pub struct ObjectProcessor {
    directory: Arc<dyn DirectoryCollector>,
    hosts: Arc<dyn HostCollector>,
    probe: Arc<dyn AvailabilityProbe>,
    ctx: CollectionContext,
    status: Option<SinkSender<ComputerStatusEvent>>,
}

impl ObjectProcessor {
    pub fn new(
        directory: Arc<dyn DirectoryCollector>,
        hosts: Arc<dyn HostCollector>,
        probe: Arc<dyn AvailabilityProbe>,
        ctx: CollectionContext,
        status: Option<SinkSender<ComputerStatusEvent>>,
    ) -> Self {
        Self {
            directory,
            hosts,
            probe,
            ctx,
            status,
        }
    }

    pub fn context(&self) -> &CollectionContext {
        &self.ctx
    }

    /// Build the output record for one entry, or `None` for labels that
    /// produce no output
    pub async fn process(
        &self,
        entry: &RawDirectoryEntry,
        resolved: &ResolvedResult,
    ) -> Option<OutputRecord> {
        let req = FacetRequest::new(resolved, entry, &self.ctx);
        let gates = FacetGates::for_label(resolved.object_type, self.ctx.methods);

        let record = match resolved.object_type {
            Label::User => OutputRecord::User(self.process_user(&req, &gates).await),
            Label::Computer => OutputRecord::Computer(self.process_computer(&req, &gates).await),
            Label::Group => OutputRecord::Group(self.process_group(&req, &gates).await),
            Label::Domain => OutputRecord::Domain(self.process_domain(&req, &gates).await),
            Label::OU => OutputRecord::Ou(self.process_ou(&req, &gates).await),
            Label::GPO => OutputRecord::Gpo(self.process_gpo(&req, &gates).await),
            Label::Container => OutputRecord::Container(self.process_container(&req, &gates).await),
            Label::RootCA => OutputRecord::RootCa(self.process_root_ca(&req, &gates).await),
            Label::IntermediateCA => {
                OutputRecord::IntermediateCa(self.process_intermediate_ca(&req, &gates).await)
            }
            Label::EnterpriseCA => {
                OutputRecord::EnterpriseCa(self.process_enterprise_ca(&req, &gates).await)
            }
            Label::NTAuthStore => {
                OutputRecord::NtAuthStore(self.process_nt_auth_store(&req, &gates).await)
            }
            Label::CertTemplate => {
                OutputRecord::CertTemplate(self.process_cert_template(&req, &gates).await)
            }
            Label::IssuancePolicy => {
                OutputRecord::IssuancePolicy(self.process_issuance_policy(&req, &gates).await)
            }
            Label::Base => return None,
        };

        Some(record)
    }

    /// Await one directory facet, turning a failure into an omitted field
    async fn facet<T, F>(&self, req: &FacetRequest<'_>, facet: Facet, call: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        match call.await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    "Failed to collect {} for {} ({}): {:#}",
                    facet,
                    req.resolved.display_name,
                    req.entry.key(),
                    e
                );
                None
            }
        }
    }

    /// Await one host facet after the throttle delay.
    ///
    /// Skipped without touching the host when the run was cancelled. The error
    /// side carries the failure reason used for status events.
    async fn host_facet<T, F>(
        &self,
        req: &FacetRequest<'_>,
        facet: Facet,
        call: F,
    ) -> std::result::Result<T, String>
    where
        F: Future<Output = Result<T>>,
    {
        self.ctx.do_delay().await;
        if self.ctx.is_cancelled() {
            debug!(
                "Skipping {} for {}: run cancelled",
                facet, req.resolved.display_name
            );
            return Err(STATUS_CANCELLED.to_string());
        }

        call.await.map_err(|e| {
            warn!(
                "Failed to collect {} for {} ({}): {:#}",
                facet,
                req.resolved.display_name,
                req.entry.key(),
                e
            );
            e.to_string()
        })
    }

    fn emit_status(&self, event: ComputerStatusEvent) {
        if let Some(status) = &self.status {
            if let Err(e) = status.send(event) {
                debug!("Dropping computer status event: {}", e);
            }
        }
    }

    /// Header fields shared by every record type
    fn new_base(req: &FacetRequest<'_>) -> BaseRecord {
        let mut props = Properties::new();
        props.insert("domain".to_string(), req.resolved.domain.clone().into());
        props.insert("name".to_string(), req.resolved.display_name.clone().into());
        if !req.entry.distinguished_name.is_empty() {
            props.insert(
                "distinguishedname".to_string(),
                req.entry.distinguished_name.to_uppercase().into(),
            );
        }
        if let Some(sid) = &req.resolved.domain_sid {
            if !sid.trim().is_empty() {
                props.insert("domainsid".to_string(), sid.clone().into());
            }
        }
        BaseRecord::new(req.resolved.object_id.clone(), props)
    }

    fn set_sam_account_name(req: &FacetRequest<'_>, base: &mut BaseRecord) {
        let sam = req
            .entry
            .get_str("samaccountname")
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null);
        base.set_property("samaccountname", sam);
    }

    /// ACL facet: aces, protection flag and the owner-rights summary
    async fn collect_acl(&self, req: &FacetRequest<'_>, base: &mut BaseRecord) {
        if let Some(aces) = self.facet(req, Facet::Acl, self.directory.acl(req)).await {
            base.set_property(
                "doesanyacegrantownerrights",
                aces.iter().any(Ace::is_permission_for_owner_rights),
            );
            base.set_property(
                "doesanyinheritedacegrantownerrights",
                aces.iter().any(Ace::is_inherited_permission_for_owner_rights),
            );
            base.aces = Some(aces);
        }

        if let Some(protected) = self
            .facet(req, Facet::AclProtection, self.directory.is_acl_protected(req))
            .await
        {
            base.is_acl_protected = Some(protected);
            base.set_property("isaclprotected", protected);
        }
    }

    async fn collect_inheritance_hashes(&self, req: &FacetRequest<'_>) -> Option<Vec<String>> {
        self.facet(req, Facet::InheritanceHashes, self.directory.inheritance_hashes(req))
            .await
    }

    async fn collect_contained_by(&self, req: &FacetRequest<'_>) -> Option<TypedPrincipal> {
        self.facet(req, Facet::ContainedBy, self.directory.containing_object(req))
            .await
            .flatten()
    }

    /// Typed properties first, raw attributes underneath when requested
    async fn merge_properties(
        &self,
        req: &FacetRequest<'_>,
        base: &mut BaseRecord,
        typed: Option<Properties>,
    ) {
        if let Some(props) = typed {
            base.merge_properties(props);
        }

        if self.ctx.config.flags.collect_all_properties {
            if let Some(all) = self
                .facet(req, Facet::AllProperties, self.directory.all_properties(req))
                .await
            {
                base.merge_properties(all);
            }
        }
    }
}
