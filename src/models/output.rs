//! Output record union and the typed facet data merged into it.
//!
//! Every optional facet is an `Option`: `None` means the facet was not
//! collected (disabled or failed) and is omitted from the serialized record,
//! while `Some(vec![])` means it was collected and came back empty.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::OWNER_RIGHTS_SID;
use crate::models::Label;

/// Free-form property bag attached to every record
pub type Properties = Map<String, Value>;

/// A principal reference with its object type
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TypedPrincipal {
    pub object_identifier: String,
    pub object_type: Label,
}

impl TypedPrincipal {
    pub fn new(object_identifier: impl Into<String>, object_type: Label) -> Self {
        Self {
            object_identifier: object_identifier.into(),
            object_type,
        }
    }
}

/// One access control entry granting a right to a principal
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Ace {
    #[serde(rename = "PrincipalSID")]
    pub principal_sid: String,
    pub principal_type: Label,
    pub right_name: String,
    pub is_inherited: bool,
}

impl Ace {
    /// Explicit grant to the OWNER RIGHTS principal
    pub fn is_permission_for_owner_rights(&self) -> bool {
        !self.is_inherited && self.principal_sid.ends_with(OWNER_RIGHTS_SID)
    }

    /// Inherited grant to the OWNER RIGHTS principal
    pub fn is_inherited_permission_for_owner_rights(&self) -> bool {
        self.is_inherited && self.principal_sid.ends_with(OWNER_RIGHTS_SID)
    }
}

/// Result of a host API call that may or may not have succeeded
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ApiResult<T> {
    pub collected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub results: T,
}

impl<T: Default> ApiResult<T> {
    pub fn collected(results: T) -> Self {
        Self {
            collected: true,
            failure_reason: None,
            results,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            collected: false,
            failure_reason: Some(reason.into()),
            results: T::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Session {
    #[serde(rename = "ComputerSID")]
    pub computer_sid: String,
    #[serde(rename = "UserSID")]
    pub user_sid: String,
}

pub type SessionApiResult = ApiResult<Vec<Session>>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct LocalGroupResult {
    pub object_identifier: String,
    pub name: String,
    pub collected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub results: Vec<TypedPrincipal>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct UserRightsResult {
    pub privilege: String,
    pub collected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub results: Vec<TypedPrincipal>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DcRegistryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_mapping_methods: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strong_certificate_binding_enforcement: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct NtlmRegistryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrict_sending_ntlm_traffic: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrict_receiving_ntlm_traffic: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lm_compatibility_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_security_signature: Option<i64>,
}

/// LDAP service posture of a domain controller
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct LdapServices {
    pub has_ldap: bool,
    pub has_ldaps: bool,
    #[serde(default)]
    pub is_signing_required: Option<bool>,
    #[serde(default)]
    pub is_channel_binding_disabled: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SmbInfo {
    pub signing_enabled: bool,
    pub signing_required: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct EnrollmentEndpoint {
    pub url: String,
    pub ntlm_enabled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CaRegistryData {
    #[serde(rename = "CASecurity")]
    pub ca_security: ApiResult<Vec<Ace>>,
    pub enrollment_agent_restrictions: ApiResult<Vec<TypedPrincipal>>,
    #[serde(rename = "IsUserSpecifiesSanEnabled")]
    pub is_user_specifies_san_enabled: ApiResult<bool>,
    pub role_separation_enabled: ApiResult<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct DomainTrust {
    pub target_domain_sid: String,
    pub target_domain_name: String,
    pub is_transitive: bool,
    pub sid_filtering_enabled: bool,
    pub trust_direction: String,
    pub trust_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct GpLink {
    #[serde(rename = "GUID")]
    pub guid: String,
    pub is_enforced: bool,
}

/// Local group changes pushed to computers by linked group policies
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct GpoChanges {
    #[serde(default)]
    pub local_admins: Vec<TypedPrincipal>,
    #[serde(default)]
    pub remote_desktop_users: Vec<TypedPrincipal>,
    #[serde(default)]
    pub dcom_users: Vec<TypedPrincipal>,
    #[serde(default)]
    pub ps_remote_users: Vec<TypedPrincipal>,
    #[serde(default)]
    pub affected_computers: Vec<TypedPrincipal>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SpnTarget {
    #[serde(rename = "ComputerSID")]
    pub computer_sid: String,
    pub port: u16,
    pub service: String,
}

/// Outcome of the availability gate for one computer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ComputerStatus {
    pub connectable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComputerStatus {
    pub fn connectable() -> Self {
        Self {
            connectable: true,
            error: None,
        }
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            connectable: false,
            error: Some(reason.into()),
        }
    }
}

/// Typed property read results returned by the directory collector
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserProperties {
    pub props: Properties,
    pub allowed_to_delegate: Vec<TypedPrincipal>,
    pub sid_history: Vec<TypedPrincipal>,
    pub unconstrained_delegation: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComputerProperties {
    pub props: Properties,
    pub allowed_to_delegate: Vec<TypedPrincipal>,
    pub allowed_to_act: Vec<TypedPrincipal>,
    pub sid_history: Vec<TypedPrincipal>,
    pub dump_smsa_password: Vec<TypedPrincipal>,
    pub unconstrained_delegation: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupProperties {
    pub props: Properties,
    pub sid_history: Vec<TypedPrincipal>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IssuancePolicyProperties {
    pub props: Properties,
    pub group_link: Option<TypedPrincipal>,
}

/// Certificate templates published on an enterprise CA
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PublishedTemplates {
    pub resolved: Vec<TypedPrincipal>,
    pub unresolved: Vec<String>,
}

/// Fields shared by every output record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct BaseRecord {
    pub object_identifier: String,
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aces: Option<Vec<Ace>>,
    #[serde(rename = "IsACLProtected", default, skip_serializing_if = "Option::is_none")]
    pub is_acl_protected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contained_by: Option<TypedPrincipal>,
}

impl BaseRecord {
    pub fn new(object_identifier: impl Into<String>, properties: Properties) -> Self {
        Self {
            object_identifier: object_identifier.into(),
            properties,
            ..Default::default()
        }
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }

    pub fn domain(&self) -> Option<&str> {
        self.properties.get("domain").and_then(Value::as_str)
    }

    pub fn distinguished_name(&self) -> Option<&str> {
        self.properties.get("distinguishedname").and_then(Value::as_str)
    }

    pub fn domain_sid(&self) -> Option<&str> {
        self.properties.get("domainsid").and_then(Value::as_str)
    }

    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) {
        self.properties.insert(name.to_string(), value.into());
    }

    /// Merge `other` into the properties. Existing keys win.
    pub fn merge_properties(&mut self, other: Properties) {
        for (key, value) in other {
            self.properties.entry(key).or_insert(value);
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(rename = "DomainSID", default, skip_serializing_if = "Option::is_none")]
    pub domain_sid: Option<String>,
    #[serde(rename = "PrimaryGroupSID", default, skip_serializing_if = "Option::is_none")]
    pub primary_group_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_to_delegate: Option<Vec<TypedPrincipal>>,
    #[serde(rename = "HasSIDHistory", default, skip_serializing_if = "Option::is_none")]
    pub has_sid_history: Option<Vec<TypedPrincipal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unconstrained_delegation: Option<bool>,
    #[serde(rename = "SPNTargets", default, skip_serializing_if = "Option::is_none")]
    pub spn_targets: Option<Vec<SpnTarget>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Computer {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(rename = "DomainSID", default, skip_serializing_if = "Option::is_none")]
    pub domain_sid: Option<String>,
    #[serde(rename = "IsDC")]
    pub is_dc: bool,
    #[serde(rename = "PrimaryGroupSID", default, skip_serializing_if = "Option::is_none")]
    pub primary_group_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_to_delegate: Option<Vec<TypedPrincipal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_to_act: Option<Vec<TypedPrincipal>>,
    #[serde(rename = "HasSIDHistory", default, skip_serializing_if = "Option::is_none")]
    pub has_sid_history: Option<Vec<TypedPrincipal>>,
    #[serde(rename = "DumpSMSAPassword", default, skip_serializing_if = "Option::is_none")]
    pub dump_smsa_password: Option<Vec<TypedPrincipal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unconstrained_delegation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<SessionApiResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged_sessions: Option<SessionApiResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_sessions: Option<SessionApiResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_groups: Option<Vec<LocalGroupResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rights: Option<Vec<UserRightsResult>>,
    #[serde(rename = "DCRegistryData", default, skip_serializing_if = "Option::is_none")]
    pub dc_registry_data: Option<DcRegistryData>,
    #[serde(rename = "NTLMRegistryData", default, skip_serializing_if = "Option::is_none")]
    pub ntlm_registry_data: Option<ApiResult<NtlmRegistryData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_web_client_running: Option<ApiResult<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smb_info: Option<ApiResult<SmbInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ComputerStatus>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<TypedPrincipal>>,
    #[serde(rename = "HasSIDHistory", default, skip_serializing_if = "Option::is_none")]
    pub has_sid_history: Option<Vec<TypedPrincipal>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Domain {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forest_root_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusts: Option<Vec<DomainTrust>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<GpLink>>,
    #[serde(rename = "GPOChanges", default, skip_serializing_if = "Option::is_none")]
    pub gpo_changes: Option<GpoChanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inheritance_hashes: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Ou {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<GpLink>>,
    #[serde(rename = "GPOChanges", default, skip_serializing_if = "Option::is_none")]
    pub gpo_changes: Option<GpoChanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inheritance_hashes: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Gpo {
    #[serde(flatten)]
    pub base: BaseRecord,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Container {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inheritance_hashes: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct RootCa {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(rename = "DomainSID", default, skip_serializing_if = "Option::is_none")]
    pub domain_sid: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct IntermediateCa {
    #[serde(flatten)]
    pub base: BaseRecord,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct EnterpriseCa {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_cert_templates: Option<Vec<TypedPrincipal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosting_computer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_enrollment_endpoints: Option<Vec<EnrollmentEndpoint>>,
    #[serde(rename = "CARegistryData", default, skip_serializing_if = "Option::is_none")]
    pub ca_registry_data: Option<CaRegistryData>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct NtAuthStore {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(rename = "DomainSID", default, skip_serializing_if = "Option::is_none")]
    pub domain_sid: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CertTemplate {
    #[serde(flatten)]
    pub base: BaseRecord,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct IssuancePolicy {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_link: Option<TypedPrincipal>,
}

/// Tagged union over every record type the pipeline emits.
///
/// Serializes as the inner record; the label decides which output file it
/// lands in.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum OutputRecord {
    User(User),
    Computer(Computer),
    Group(Group),
    Domain(Domain),
    Ou(Ou),
    Gpo(Gpo),
    Container(Container),
    RootCa(RootCa),
    IntermediateCa(IntermediateCa),
    EnterpriseCa(EnterpriseCa),
    NtAuthStore(NtAuthStore),
    CertTemplate(CertTemplate),
    IssuancePolicy(IssuancePolicy),
}

impl OutputRecord {
    pub fn label(&self) -> Label {
        match self {
            OutputRecord::User(_) => Label::User,
            OutputRecord::Computer(_) => Label::Computer,
            OutputRecord::Group(_) => Label::Group,
            OutputRecord::Domain(_) => Label::Domain,
            OutputRecord::Ou(_) => Label::OU,
            OutputRecord::Gpo(_) => Label::GPO,
            OutputRecord::Container(_) => Label::Container,
            OutputRecord::RootCa(_) => Label::RootCA,
            OutputRecord::IntermediateCa(_) => Label::IntermediateCA,
            OutputRecord::EnterpriseCa(_) => Label::EnterpriseCA,
            OutputRecord::NtAuthStore(_) => Label::NTAuthStore,
            OutputRecord::CertTemplate(_) => Label::CertTemplate,
            OutputRecord::IssuancePolicy(_) => Label::IssuancePolicy,
        }
    }

    pub fn base(&self) -> &BaseRecord {
        match self {
            OutputRecord::User(r) => &r.base,
            OutputRecord::Computer(r) => &r.base,
            OutputRecord::Group(r) => &r.base,
            OutputRecord::Domain(r) => &r.base,
            OutputRecord::Ou(r) => &r.base,
            OutputRecord::Gpo(r) => &r.base,
            OutputRecord::Container(r) => &r.base,
            OutputRecord::RootCa(r) => &r.base,
            OutputRecord::IntermediateCa(r) => &r.base,
            OutputRecord::EnterpriseCa(r) => &r.base,
            OutputRecord::NtAuthStore(r) => &r.base,
            OutputRecord::CertTemplate(r) => &r.base,
            OutputRecord::IssuancePolicy(r) => &r.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseRecord {
        match self {
            OutputRecord::User(r) => &mut r.base,
            OutputRecord::Computer(r) => &mut r.base,
            OutputRecord::Group(r) => &mut r.base,
            OutputRecord::Domain(r) => &mut r.base,
            OutputRecord::Ou(r) => &mut r.base,
            OutputRecord::Gpo(r) => &mut r.base,
            OutputRecord::Container(r) => &mut r.base,
            OutputRecord::RootCa(r) => &mut r.base,
            OutputRecord::IntermediateCa(r) => &mut r.base,
            OutputRecord::EnterpriseCa(r) => &mut r.base,
            OutputRecord::NtAuthStore(r) => &mut r.base,
            OutputRecord::CertTemplate(r) => &mut r.base,
            OutputRecord::IssuancePolicy(r) => &mut r.base,
        }
    }

    pub fn object_identifier(&self) -> &str {
        &self.base().object_identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_facet_is_omitted_and_empty_facet_is_kept() {
        let mut group = Group {
            base: BaseRecord::new("S-1-5-21-1-2-3-512", Properties::new()),
            ..Default::default()
        };
        let absent = serde_json::to_value(OutputRecord::Group(group.clone())).unwrap();
        assert!(absent.get("Members").is_none());

        group.members = Some(Vec::new());
        let empty = serde_json::to_value(OutputRecord::Group(group)).unwrap();
        assert_eq!(empty["Members"], serde_json::json!([]));
        assert_eq!(empty["ObjectIdentifier"], "S-1-5-21-1-2-3-512");
    }

    #[test]
    fn test_owner_rights_detection() {
        let explicit = Ace {
            principal_sid: "S-1-3-4".to_string(),
            principal_type: Label::Group,
            right_name: "GenericAll".to_string(),
            is_inherited: false,
        };
        let inherited = Ace { is_inherited: true, ..explicit.clone() };
        assert!(explicit.is_permission_for_owner_rights());
        assert!(!explicit.is_inherited_permission_for_owner_rights());
        assert!(inherited.is_inherited_permission_for_owner_rights());
    }

    #[test]
    fn test_merge_properties_keeps_existing_keys() {
        let mut base = BaseRecord::new("ID", Properties::new());
        base.set_property("name", "ALICE@CONTOSO.LOCAL");
        let mut other = Properties::new();
        other.insert("name".to_string(), "other".into());
        other.insert("enabled".to_string(), true.into());
        base.merge_properties(other);
        assert_eq!(base.name(), Some("ALICE@CONTOSO.LOCAL"));
        assert_eq!(base.property("enabled"), Some(&Value::Bool(true)));
    }
}
