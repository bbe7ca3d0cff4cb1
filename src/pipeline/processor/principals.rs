use crate::collectors::traits::{Facet, FacetRequest};
use crate::models::output::{Container, Domain, Gpo, Group, Ou, User};
use crate::pipeline::processor::{FacetGates, ObjectProcessor};

impl ObjectProcessor {
    pub(super) async fn process_user(&self, req: &FacetRequest<'_>, gates: &FacetGates) -> User {
        let mut user = User {
            base: Self::new_base(req),
            domain_sid: req.resolved.domain_sid.clone(),
            ..Default::default()
        };
        Self::set_sam_account_name(req, &mut user.base);

        if gates.acl {
            self.collect_acl(req, &mut user.base).await;
            // Readers only extend a collected ACL; a failed ACL stays absent
            if user.base.aces.is_some() {
                if let Some(readers) = self
                    .facet(req, Facet::GmsaReaders, self.directory.gmsa_readers(req))
                    .await
                {
                    if let Some(aces) = user.base.aces.as_mut() {
                        aces.extend(readers);
                    }
                }
            }
        }

        if gates.group {
            user.primary_group_sid = self
                .facet(req, Facet::PrimaryGroup, self.directory.primary_group_sid(req))
                .await
                .flatten();
        }

        if gates.object_props {
            let props = self
                .facet(req, Facet::Properties, self.directory.user_properties(req))
                .await;
            let typed = props.as_ref().map(|p| p.props.clone());
            self.merge_properties(req, &mut user.base, typed).await;
            if let Some(props) = props {
                user.has_sid_history = Some(props.sid_history);
                user.allowed_to_delegate = Some(props.allowed_to_delegate);
                user.unconstrained_delegation = Some(props.unconstrained_delegation);
            }
        }

        if gates.spn_targets {
            user.spn_targets = self
                .facet(req, Facet::SpnTargets, self.directory.spn_targets(req))
                .await;
        }

        if gates.container {
            user.base.contained_by = self.collect_contained_by(req).await;
        }

        user
    }

    pub(super) async fn process_group(&self, req: &FacetRequest<'_>, gates: &FacetGates) -> Group {
        let mut group = Group {
            base: Self::new_base(req),
            ..Default::default()
        };
        Self::set_sam_account_name(req, &mut group.base);

        if gates.acl {
            self.collect_acl(req, &mut group.base).await;
        }

        if gates.group {
            group.members = self
                .facet(req, Facet::Members, self.directory.group_members(req))
                .await;
        }

        if gates.object_props {
            let props = self
                .facet(req, Facet::Properties, self.directory.group_properties(req))
                .await;
            let typed = props.as_ref().map(|p| p.props.clone());
            self.merge_properties(req, &mut group.base, typed).await;
            group.has_sid_history = props.map(|p| p.sid_history);
        }

        if gates.container {
            group.base.contained_by = self.collect_contained_by(req).await;
        }

        group
    }

    pub(super) async fn process_domain(&self, req: &FacetRequest<'_>, gates: &FacetGates) -> Domain {
        let mut domain = Domain {
            base: Self::new_base(req),
            ..Default::default()
        };

        // Forest linkage comes from the directory itself, independent of methods
        domain.forest_root_identifier = self
            .facet(req, Facet::ForestRoot, self.directory.forest_root_sid(req))
            .await
            .flatten();

        if gates.acl {
            self.collect_acl(req, &mut domain.base).await;
            domain.inheritance_hashes = self.collect_inheritance_hashes(req).await;
        }

        if gates.trusts {
            domain.trusts = self
                .facet(req, Facet::Trusts, self.directory.trusts(req))
                .await;
        }

        if gates.object_props {
            let typed = self
                .facet(req, Facet::Properties, self.directory.domain_properties(req))
                .await;
            self.merge_properties(req, &mut domain.base, typed).await;
        }

        if gates.container {
            domain.links = self
                .facet(req, Facet::GpLinks, self.directory.gp_links(req))
                .await;
        }

        if gates.gpo_local_group {
            domain.gpo_changes = self
                .facet(req, Facet::GpoLocalGroups, self.directory.gpo_local_groups(req))
                .await;
        }

        domain
    }

    pub(super) async fn process_ou(&self, req: &FacetRequest<'_>, gates: &FacetGates) -> Ou {
        let mut ou = Ou {
            base: Self::new_base(req),
            ..Default::default()
        };

        if gates.acl {
            self.collect_acl(req, &mut ou.base).await;
            ou.inheritance_hashes = self.collect_inheritance_hashes(req).await;
        }

        if gates.object_props {
            let typed = self
                .facet(req, Facet::Properties, self.directory.label_properties(req))
                .await;
            self.merge_properties(req, &mut ou.base, typed).await;
        }

        if gates.container {
            ou.base.contained_by = self.collect_contained_by(req).await;
            let options = req.entry.get_i64("gpoptions").unwrap_or(0);
            ou.base.set_property("blocksinheritance", options == 1);
            ou.links = self
                .facet(req, Facet::GpLinks, self.directory.gp_links(req))
                .await;
        }

        if gates.gpo_local_group {
            ou.gpo_changes = self
                .facet(req, Facet::GpoLocalGroups, self.directory.gpo_local_groups(req))
                .await;
        }

        ou
    }

    pub(super) async fn process_gpo(&self, req: &FacetRequest<'_>, gates: &FacetGates) -> Gpo {
        let mut gpo = Gpo {
            base: Self::new_base(req),
        };

        if gates.acl {
            self.collect_acl(req, &mut gpo.base).await;
        }

        if gates.object_props {
            let typed = self
                .facet(req, Facet::Properties, self.directory.label_properties(req))
                .await;
            self.merge_properties(req, &mut gpo.base, typed).await;
        }

        gpo
    }

    pub(super) async fn process_container(
        &self,
        req: &FacetRequest<'_>,
        gates: &FacetGates,
    ) -> Container {
        let mut container = Container {
            base: Self::new_base(req),
            ..Default::default()
        };

        if gates.container {
            container.base.contained_by = self.collect_contained_by(req).await;
        }

        if gates.acl {
            self.collect_acl(req, &mut container.base).await;
            container.inheritance_hashes = self.collect_inheritance_hashes(req).await;
        }

        if gates.object_props {
            let typed = self
                .facet(req, Facet::Properties, self.directory.label_properties(req))
                .await;
            self.merge_properties(req, &mut container.base, typed).await;
        }

        container
    }
}
