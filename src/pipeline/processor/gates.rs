use crate::config::{CollectionMethod, CollectionMethodSet};
use crate::models::Label;

/// Which facets are enabled for one object type.
///
/// Computed once per item so the enablement policy lives in one place. For the
/// certificate family and plain containers the directory facets are unlocked
/// by their own method or by `CertServices`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FacetGates {
    pub acl: bool,
    pub object_props: bool,
    pub container: bool,
    pub group: bool,
    pub spn_targets: bool,
    pub trusts: bool,
    pub gpo_local_group: bool,
    pub cert_services: bool,
    pub ca_registry: bool,
    /// Any host facet wanted for a computer
    pub computer_network: bool,
    pub sessions: bool,
    pub logged_on: bool,
    pub user_rights: bool,
    pub ntlm_registry: bool,
    pub web_client: bool,
    pub smb_info: bool,
    pub local_groups: bool,
    pub dc_registry: bool,
    pub ldap_services: bool,
}

impl FacetGates {
    pub fn for_label(label: Label, methods: CollectionMethodSet) -> Self {
        let has = |m: CollectionMethod| methods.contains(m);
        let umbrella = (label.is_cert_authority_family() || label == Label::Container)
            && has(CollectionMethod::CertServices);

        let mut gates = FacetGates {
            acl: has(CollectionMethod::ACL) || umbrella,
            object_props: has(CollectionMethod::ObjectProps) || umbrella,
            container: has(CollectionMethod::Container) || umbrella,
            group: has(CollectionMethod::Group),
            spn_targets: has(CollectionMethod::SPNTargets),
            trusts: has(CollectionMethod::Trusts),
            gpo_local_group: has(CollectionMethod::GPOLocalGroup),
            ..Default::default()
        };

        match label {
            Label::Computer => {
                gates.computer_network = methods.is_computer_collection_set()
                    || has(CollectionMethod::LdapServices);
                gates.sessions = has(CollectionMethod::Session);
                gates.logged_on = has(CollectionMethod::LoggedOn);
                gates.user_rights = has(CollectionMethod::UserRights);
                gates.ntlm_registry = has(CollectionMethod::NTLMRegistry);
                gates.web_client = has(CollectionMethod::WebClientService);
                gates.smb_info = has(CollectionMethod::SmbInfo);
                gates.local_groups = methods.is_local_group_collection_set();
                gates.dc_registry = has(CollectionMethod::DCRegistry);
                gates.ldap_services = has(CollectionMethod::LdapServices);
            }
            Label::EnterpriseCA => {
                gates.cert_services = has(CollectionMethod::CertServices);
                gates.ca_registry = has(CollectionMethod::CARegistry);
            }
            _ => {}
        }

        gates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cert_services_unlocks_ca_family_facets() {
        let methods = CollectionMethodSet::of(&[CollectionMethod::CertServices]);
        for label in [Label::RootCA, Label::EnterpriseCA, Label::CertTemplate, Label::Container] {
            let gates = FacetGates::for_label(label, methods);
            assert!(gates.acl && gates.object_props && gates.container, "{}", label);
        }

        let user = FacetGates::for_label(Label::User, methods);
        assert!(!user.acl && !user.object_props && !user.container);
    }

    #[test]
    fn test_explicit_flag_alone_also_unlocks() {
        let methods = CollectionMethodSet::of(&[CollectionMethod::ACL]);
        let gates = FacetGates::for_label(Label::NTAuthStore, methods);
        assert!(gates.acl);
        assert!(!gates.object_props);
    }

    #[test]
    fn test_computer_network_gate() {
        let dc_only = CollectionMethodSet::dc_only();
        assert!(!FacetGates::for_label(Label::Computer, dc_only).computer_network);

        let ldap = CollectionMethodSet::of(&[CollectionMethod::LdapServices]);
        let gates = FacetGates::for_label(Label::Computer, ldap);
        assert!(gates.computer_network);
        assert!(!gates.sessions && !gates.local_groups);

        let gates = FacetGates::for_label(Label::Computer, CollectionMethodSet::default_methods());
        assert!(gates.computer_network && gates.sessions && gates.local_groups);
        assert!(!gates.logged_on);
    }

    #[test]
    fn test_host_gates_only_apply_to_computers() {
        let gates = FacetGates::for_label(Label::User, CollectionMethodSet::all());
        assert!(!gates.computer_network && !gates.sessions && !gates.ca_registry);
        assert!(FacetGates::for_label(Label::EnterpriseCA, CollectionMethodSet::all()).ca_registry);
    }
}
