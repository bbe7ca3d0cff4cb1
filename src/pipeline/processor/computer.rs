use log::debug;

use crate::collectors::traits::{Facet, FacetRequest};
use crate::constants::STATUS_SUCCESS;
use crate::models::output::{Computer, SessionApiResult};
use crate::models::ComputerStatusEvent;
use crate::pipeline::processor::{FacetGates, ObjectProcessor};

impl ObjectProcessor {
    /// Directory facets, then the availability gate, then host facets.
    ///
    /// An unreachable host ends processing right after the gate with a status
    /// event and a "not connectable" status on the record.
    pub(super) async fn process_computer(
        &self,
        req: &FacetRequest<'_>,
        gates: &FacetGates,
    ) -> Computer {
        let mut computer = Computer {
            base: Self::new_base(req),
            domain_sid: req.resolved.domain_sid.clone(),
            is_dc: req.resolved.is_domain_controller,
            ..Default::default()
        };
        Self::set_sam_account_name(req, &mut computer.base);
        computer.base.set_property("haslaps", has_laps(req));
        computer.base.set_property("isdc", computer.is_dc);

        if gates.acl {
            self.collect_acl(req, &mut computer.base).await;
        }

        if gates.group {
            computer.primary_group_sid = self
                .facet(req, Facet::PrimaryGroup, self.directory.primary_group_sid(req))
                .await
                .flatten();
        }

        if gates.object_props {
            let props = self
                .facet(req, Facet::Properties, self.directory.computer_properties(req))
                .await;
            let typed = props.as_ref().map(|p| p.props.clone());
            self.merge_properties(req, &mut computer.base, typed).await;
            if let Some(props) = props {
                computer.allowed_to_delegate = Some(props.allowed_to_delegate);
                computer.allowed_to_act = Some(props.allowed_to_act);
                computer.has_sid_history = Some(props.sid_history);
                computer.dump_smsa_password = Some(props.dump_smsa_password);
                computer.unconstrained_delegation = Some(props.unconstrained_delegation);
            }
        }

        if gates.container {
            computer.base.contained_by = self.collect_contained_by(req).await;
        }

        let availability = self.probe.availability(req).await;
        if !availability.connectable {
            let reason = availability.error.clone().unwrap_or_default();
            debug!(
                "{} is not available: {}",
                req.resolved.display_name, reason
            );
            self.emit_status(ComputerStatusEvent::failure(
                &req.resolved.display_name,
                "Availability",
                &reason,
            ));
            computer.status = Some(availability);
            return computer;
        }

        if !gates.computer_network {
            return computer;
        }

        if req.resolved.is_domain_controller {
            self.process_domain_controller(req, gates, &mut computer).await;
        }

        if gates.sessions {
            let result = self
                .host_facet(req, Facet::Sessions, self.hosts.sessions(req))
                .await;
            computer.sessions = self.record_session_status(req, Facet::Sessions, result);
        }

        if gates.logged_on {
            let result = self
                .host_facet(req, Facet::PrivilegedSessions, self.hosts.privileged_sessions(req))
                .await;
            computer.privileged_sessions =
                self.record_session_status(req, Facet::PrivilegedSessions, result);

            if !self.ctx.config.flags.no_registry_logged_on {
                let result = self
                    .host_facet(req, Facet::RegistrySessions, self.hosts.registry_sessions(req))
                    .await;
                computer.registry_sessions =
                    self.record_session_status(req, Facet::RegistrySessions, result);
            }
        }

        if gates.user_rights {
            computer.user_rights = self
                .host_facet(req, Facet::UserRights, self.hosts.user_rights(req))
                .await
                .ok();
        }

        if gates.ntlm_registry {
            computer.ntlm_registry_data = self
                .host_facet(req, Facet::NtlmRegistry, self.hosts.ntlm_registry(req))
                .await
                .ok();
        }

        if gates.web_client {
            computer.is_web_client_running = self
                .host_facet(req, Facet::WebClient, self.hosts.web_client_running(req))
                .await
                .ok();
        }

        if gates.smb_info {
            computer.smb_info = self
                .host_facet(req, Facet::SmbInfo, self.hosts.smb_info(req))
                .await
                .ok();
        }

        if gates.local_groups {
            computer.local_groups = self
                .host_facet(req, Facet::LocalGroups, self.hosts.local_groups(req))
                .await
                .ok();
        }

        computer
    }

    /// DC registry and LDAP service checks. Runs after the availability gate
    /// and before the generic host facets.
    async fn process_domain_controller(
        &self,
        req: &FacetRequest<'_>,
        gates: &FacetGates,
        computer: &mut Computer,
    ) {
        debug!("Processing DC: {}", req.api_name());

        if gates.dc_registry {
            computer.dc_registry_data = self
                .host_facet(req, Facet::DcRegistry, self.hosts.dc_registry(req))
                .await
                .ok();
        }

        if gates.ldap_services {
            if let Ok(services) = self
                .host_facet(req, Facet::LdapServices, self.hosts.ldap_services(req))
                .await
            {
                let base = &mut computer.base;
                base.set_property("ldapavailable", services.has_ldap);
                base.set_property("ldapsavailable", services.has_ldaps);
                if let Some(disabled) = services.is_channel_binding_disabled {
                    base.set_property("ldapsepa", !disabled);
                }
                if let Some(required) = services.is_signing_required {
                    base.set_property("ldapsigning", required);
                }
            }
        }
    }

    /// Emit the status event for a session task and keep the result
    fn record_session_status(
        &self,
        req: &FacetRequest<'_>,
        facet: Facet,
        result: Result<SessionApiResult, String>,
    ) -> Option<SessionApiResult> {
        if self.ctx.config.flags.dump_computer_status {
            let status = match &result {
                Ok(api) if api.collected => STATUS_SUCCESS.to_string(),
                Ok(api) => api.failure_reason.clone().unwrap_or_default(),
                Err(reason) => reason.clone(),
            };
            self.emit_status(ComputerStatusEvent::new(
                &req.resolved.display_name,
                facet.task_name(),
                &status,
            ));
        }
        result.ok()
    }
}

/// Legacy or Windows LAPS attributes present on the computer object
fn has_laps(req: &FacetRequest<'_>) -> bool {
    ["ms-mcs-admpwdexpirationtime", "mslaps-passwordexpirationtime"]
        .iter()
        .any(|attr| req.entry.has_attribute(attr))
}
