use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Independently toggleable facets of data collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionMethod {
    Group,
    LocalAdmin,
    GPOLocalGroup,
    Session,
    LoggedOn,
    Trusts,
    ACL,
    Container,
    RDP,
    ObjectProps,
    DCOM,
    SPNTargets,
    PSRemote,
    UserRights,
    CARegistry,
    DCRegistry,
    CertServices,
    LdapServices,
    WebClientService,
    SmbInfo,
    NTLMRegistry,
}

impl CollectionMethod {
    pub const ALL: [CollectionMethod; 21] = [
        CollectionMethod::Group,
        CollectionMethod::LocalAdmin,
        CollectionMethod::GPOLocalGroup,
        CollectionMethod::Session,
        CollectionMethod::LoggedOn,
        CollectionMethod::Trusts,
        CollectionMethod::ACL,
        CollectionMethod::Container,
        CollectionMethod::RDP,
        CollectionMethod::ObjectProps,
        CollectionMethod::DCOM,
        CollectionMethod::SPNTargets,
        CollectionMethod::PSRemote,
        CollectionMethod::UserRights,
        CollectionMethod::CARegistry,
        CollectionMethod::DCRegistry,
        CollectionMethod::CertServices,
        CollectionMethod::LdapServices,
        CollectionMethod::WebClientService,
        CollectionMethod::SmbInfo,
        CollectionMethod::NTLMRegistry,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for CollectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Immutable bitset of enabled collection methods.
///
/// Built once from configuration and shared read-only for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CollectionMethodSet(u32);

impl CollectionMethodSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn of(methods: &[CollectionMethod]) -> Self {
        methods.iter().fold(Self::empty(), |set, m| set.with(*m))
    }

    pub fn with(self, method: CollectionMethod) -> Self {
        Self(self.0 | method.bit())
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(&self, method: CollectionMethod) -> bool {
        self.0 & method.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = CollectionMethod> + '_ {
        CollectionMethod::ALL.into_iter().filter(|m| self.contains(*m))
    }

    /// LocalAdmin, RDP, DCOM and PSRemote
    pub fn local_group() -> Self {
        Self::of(&[
            CollectionMethod::LocalAdmin,
            CollectionMethod::RDP,
            CollectionMethod::DCOM,
            CollectionMethod::PSRemote,
        ])
    }

    /// Everything that needs to talk to the computer itself
    pub fn computer_only() -> Self {
        Self::local_group().union(Self::of(&[
            CollectionMethod::Session,
            CollectionMethod::UserRights,
            CollectionMethod::CARegistry,
            CollectionMethod::DCRegistry,
            CollectionMethod::WebClientService,
            CollectionMethod::SmbInfo,
            CollectionMethod::NTLMRegistry,
        ]))
    }

    /// Everything that can be answered by the directory alone
    pub fn dc_only() -> Self {
        Self::of(&[
            CollectionMethod::ACL,
            CollectionMethod::Container,
            CollectionMethod::Group,
            CollectionMethod::ObjectProps,
            CollectionMethod::Trusts,
            CollectionMethod::GPOLocalGroup,
            CollectionMethod::CertServices,
        ])
    }

    pub fn default_methods() -> Self {
        Self::local_group().union(Self::of(&[
            CollectionMethod::Group,
            CollectionMethod::Session,
            CollectionMethod::Trusts,
            CollectionMethod::ACL,
            CollectionMethod::ObjectProps,
            CollectionMethod::SPNTargets,
            CollectionMethod::Container,
            CollectionMethod::CertServices,
            CollectionMethod::LdapServices,
            CollectionMethod::SmbInfo,
        ]))
    }

    pub fn all() -> Self {
        Self::of(&CollectionMethod::ALL)
    }

    /// True when any method requires contacting computers
    pub fn is_computer_collection_set(&self) -> bool {
        self.0 & Self::computer_only().with(CollectionMethod::LoggedOn).0 != 0
    }

    pub fn is_local_group_collection_set(&self) -> bool {
        self.0 & Self::local_group().0 != 0
    }

    /// Resolve a list of method or group names into a set.
    ///
    /// # Arguments
    ///
    /// * `names` - Method names (`ACL`, `Session`, ...) or group names
    ///   (`Default`, `All`, `DCOnly`, `ComputerOnly`, `LocalGroup`), case-insensitive
    ///
    /// # Returns
    ///
    /// * `Ok(CollectionMethodSet)` - Union of every named method
    /// * `Err` - If any name is unknown
    pub fn parse_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        names
            .iter()
            .try_fold(Self::empty(), |set, name| Ok(set.union(name.as_ref().parse()?)))
    }
}

impl FromStr for CollectionMethodSet {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> Result<Self> {
        let name = name.trim();
        let group = match name.to_ascii_lowercase().as_str() {
            "all" => Some(Self::all()),
            "default" => Some(Self::default_methods()),
            "dconly" => Some(Self::dc_only()),
            "computeronly" => Some(Self::computer_only()),
            "localgroup" => Some(Self::local_group()),
            _ => None,
        };
        if let Some(group) = group {
            return Ok(group);
        }

        match CollectionMethod::ALL
            .iter()
            .find(|m| m.to_string().eq_ignore_ascii_case(name))
        {
            Some(method) => Ok(Self::empty().with(*method)),
            None => bail!("Unknown collection method: {}", name),
        }
    }
}

impl fmt::Display for CollectionMethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|m| m.to_string()).collect();
        f.write_str(&names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        let set = CollectionMethodSet::parse_names(&["acl", "OBJECTPROPS"]).unwrap();
        assert!(set.contains(CollectionMethod::ACL));
        assert!(set.contains(CollectionMethod::ObjectProps));
        assert!(!set.contains(CollectionMethod::Session));
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        assert!(CollectionMethodSet::parse_names(&["ACL", "Bogus"]).is_err());
    }

    #[test]
    fn test_loop_methods_are_not_accepted() {
        for name in ["SessionLoop", "LoggedOnLoop"] {
            assert!(name.parse::<CollectionMethodSet>().is_err());
        }
    }

    #[test]
    fn test_groups() {
        let dc_only: CollectionMethodSet = "DCOnly".parse().unwrap();
        assert!(!dc_only.is_computer_collection_set());
        assert!(dc_only.contains(CollectionMethod::CertServices));

        let local: CollectionMethodSet = "LocalGroup".parse().unwrap();
        assert!(local.is_local_group_collection_set());
        assert!(local.is_computer_collection_set());

        let all = CollectionMethodSet::all();
        assert_eq!(all.iter().count(), CollectionMethod::ALL.len());

        let default_set = CollectionMethodSet::default_methods();
        assert!(default_set.contains(CollectionMethod::LdapServices));
        assert!(!default_set.contains(CollectionMethod::LoggedOn));
    }

    #[test]
    fn test_logged_on_alone_is_a_computer_collection() {
        let set = CollectionMethodSet::of(&[CollectionMethod::LoggedOn]);
        assert!(set.is_computer_collection_set());
        assert!(!set.is_local_group_collection_set());
    }

    #[test]
    fn test_display_lists_methods() {
        let set = CollectionMethodSet::of(&[CollectionMethod::ACL, CollectionMethod::Group]);
        assert_eq!(set.to_string(), "Group, ACL");
    }
}
