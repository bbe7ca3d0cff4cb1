use log::warn;
use serde_json::Value;

use crate::collectors::traits::{Facet, FacetRequest};
use crate::models::output::{
    BaseRecord, CertTemplate, EnterpriseCa, IntermediateCa, IssuancePolicy, NtAuthStore, RootCa,
};
use crate::models::ComputerStatusEvent;
use crate::pipeline::processor::{FacetGates, ObjectProcessor};

impl ObjectProcessor {
    /// ACL, label properties and container for the simple certificate types
    async fn collect_cert_common(
        &self,
        req: &FacetRequest<'_>,
        gates: &FacetGates,
        base: &mut BaseRecord,
    ) {
        if gates.acl {
            self.collect_acl(req, base).await;
        }

        if gates.object_props {
            let typed = self
                .facet(req, Facet::Properties, self.directory.label_properties(req))
                .await;
            self.merge_properties(req, base, typed).await;
        }

        if gates.container {
            base.contained_by = self.collect_contained_by(req).await;
        }
    }

    pub(super) async fn process_root_ca(&self, req: &FacetRequest<'_>, gates: &FacetGates) -> RootCa {
        let mut root = RootCa {
            base: Self::new_base(req),
            domain_sid: req.resolved.domain_sid.clone(),
        };
        self.collect_cert_common(req, gates, &mut root.base).await;
        root
    }

    pub(super) async fn process_intermediate_ca(
        &self,
        req: &FacetRequest<'_>,
        gates: &FacetGates,
    ) -> IntermediateCa {
        let mut aia = IntermediateCa {
            base: Self::new_base(req),
        };
        self.collect_cert_common(req, gates, &mut aia.base).await;
        aia
    }

    pub(super) async fn process_nt_auth_store(
        &self,
        req: &FacetRequest<'_>,
        gates: &FacetGates,
    ) -> NtAuthStore {
        let mut store = NtAuthStore {
            base: Self::new_base(req),
            domain_sid: req.resolved.domain_sid.clone(),
        };
        self.collect_cert_common(req, gates, &mut store.base).await;
        store
    }

    pub(super) async fn process_cert_template(
        &self,
        req: &FacetRequest<'_>,
        gates: &FacetGates,
    ) -> CertTemplate {
        let mut template = CertTemplate {
            base: Self::new_base(req),
        };
        self.collect_cert_common(req, gates, &mut template.base).await;
        template
    }

    pub(super) async fn process_issuance_policy(
        &self,
        req: &FacetRequest<'_>,
        gates: &FacetGates,
    ) -> IssuancePolicy {
        let mut policy = IssuancePolicy {
            base: Self::new_base(req),
            ..Default::default()
        };

        if gates.acl {
            self.collect_acl(req, &mut policy.base).await;
        }

        if gates.object_props {
            let props = self
                .facet(req, Facet::Properties, self.directory.issuance_policy_properties(req))
                .await;
            let typed = props.as_ref().map(|p| p.props.clone());
            self.merge_properties(req, &mut policy.base, typed).await;
            policy.group_link = props.and_then(|p| p.group_link);
        }

        if gates.container {
            policy.base.contained_by = self.collect_contained_by(req).await;
        }

        policy
    }

    pub(super) async fn process_enterprise_ca(
        &self,
        req: &FacetRequest<'_>,
        gates: &FacetGates,
    ) -> EnterpriseCa {
        let mut ca = EnterpriseCa {
            base: Self::new_base(req),
            ..Default::default()
        };

        if gates.acl {
            self.collect_acl(req, &mut ca.base).await;
        }

        if gates.object_props {
            let typed = self
                .facet(req, Facet::Properties, self.directory.label_properties(req))
                .await;
            self.merge_properties(req, &mut ca.base, typed).await;

            if req.entry.has_attribute("certificatetemplates") {
                if let Some(published) = self
                    .facet(req, Facet::PublishedTemplates, self.directory.published_templates(req))
                    .await
                {
                    ca.enabled_cert_templates = Some(published.resolved);
                    ca.base
                        .set_property("unresolvedpublishedtemplates", published.unresolved);
                }
            }
        }

        if gates.container {
            ca.base.contained_by = self.collect_contained_by(req).await;
        }

        if !(gates.cert_services || gates.ca_registry) {
            return ca;
        }

        let ca_name = req.entry.get_str("name").or_else(|| req.entry.get_str("cn"));
        let dns_host_name = req.entry.get_str("dnshostname");
        let (Some(ca_name), Some(dns_host_name)) = (ca_name, dns_host_name) else {
            warn!(
                "The CA name or dnshostname of {} is missing",
                req.resolved.display_name
            );
            if gates.ca_registry {
                set_ca_registry_flags(&mut ca.base, [false; 4]);
            }
            return ca;
        };

        ca.hosting_computer = self.resolve_hosting_computer(req, ca_name, dns_host_name).await;

        if gates.cert_services {
            ca.http_enrollment_endpoints = self
                .host_facet(
                    req,
                    Facet::EnrollmentEndpoints,
                    self.hosts.enrollment_endpoints(req, dns_host_name),
                )
                .await
                .ok();
        }

        if gates.ca_registry {
            let registry = self
                .host_facet(req, Facet::CaRegistry, self.hosts.ca_registry(req, dns_host_name))
                .await
                .ok();
            let flags = registry
                .as_ref()
                .map(|r| {
                    [
                        r.ca_security.collected,
                        r.enrollment_agent_restrictions.collected,
                        r.is_user_specifies_san_enabled.collected,
                        r.role_separation_enabled.collected,
                    ]
                })
                .unwrap_or([false; 4]);
            set_ca_registry_flags(&mut ca.base, flags);
            ca.ca_registry_data = registry;
        }

        ca
    }

    /// Map the CA host name to its computer SID, recording a status event
    /// when it resolves
    async fn resolve_hosting_computer(
        &self,
        req: &FacetRequest<'_>,
        ca_name: &str,
        dns_host_name: &str,
    ) -> Option<String> {
        let sid = self
            .facet(
                req,
                Facet::HostingComputer,
                self.directory.resolve_host_sid(req, dns_host_name),
            )
            .await
            .flatten()
            .filter(|sid| sid.starts_with("S-1-"));

        match &sid {
            Some(_) => self.emit_status(ComputerStatusEvent::success(
                &req.resolved.display_name,
                Facet::HostingComputer.task_name(),
            )),
            None => warn!(
                "CA {} host ({}) could not be resolved to a SID",
                ca_name, dns_host_name
            ),
        }
        sid
    }
}

fn set_ca_registry_flags(base: &mut BaseRecord, flags: [bool; 4]) {
    let names = [
        "casecuritycollected",
        "enrollmentagentrestrictionscollected",
        "isuserspecifiessanenabledcollected",
        "roleseparationenabledcollected",
    ];
    for (name, collected) in names.into_iter().zip(flags) {
        base.set_property(name, Value::Bool(collected));
    }
}
