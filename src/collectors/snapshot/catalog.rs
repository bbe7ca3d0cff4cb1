use std::sync::Arc;

use anyhow::Result;
use log::debug;

use crate::collectors::snapshot::{classify, domain_name_from_dn, Snapshot};
use crate::collectors::traits::WellKnownCatalog;
use crate::constants::{
    AUTHENTICATED_USERS_SID, ENTERPRISE_DC_SUFFIX, EVERYONE_SID, UAC_SERVER_TRUST_ACCOUNT,
};
use crate::models::output::{BaseRecord, Group, OutputRecord, Properties, TypedPrincipal};
use crate::models::Label;

const DOMAIN_USERS_RID: u32 = 513;
const DOMAIN_COMPUTERS_RID: u32 = 515;

/// Well-known groups synthesized for every domain in a snapshot
pub struct SnapshotCatalog {
    snapshot: Arc<Snapshot>,
}

impl SnapshotCatalog {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    fn domain_controllers(&self, domain_sid: &str) -> Vec<TypedPrincipal> {
        self.snapshot
            .entries()
            .iter()
            .filter(|e| classify(e) == Label::Computer)
            .filter(|e| {
                e.get_i64("useraccountcontrol")
                    .map_or(false, |uac| uac & UAC_SERVER_TRUST_ACCOUNT != 0)
            })
            .filter_map(|e| e.get_str("objectsid"))
            .filter(|sid| sid.starts_with(&format!("{}-", domain_sid)))
            .map(|sid| TypedPrincipal::new(sid.to_uppercase(), Label::Computer))
            .collect()
    }
}

fn well_known_group(
    domain: &str,
    domain_sid: &str,
    sid: &str,
    name: &str,
    members: Vec<TypedPrincipal>,
) -> OutputRecord {
    let mut props = Properties::new();
    props.insert("name".to_string(), format!("{}@{}", name, domain).into());
    props.insert("domain".to_string(), domain.into());
    props.insert("domainsid".to_string(), domain_sid.into());
    OutputRecord::Group(Group {
        base: BaseRecord::new(format!("{}-{}", domain, sid), props),
        members: Some(members),
        ..Default::default()
    })
}

impl WellKnownCatalog for SnapshotCatalog {
    fn principals(&self) -> Result<Vec<OutputRecord>> {
        let mut principals = Vec::new();

        for domain_entry in self.snapshot.domains() {
            let Some(domain_sid) = domain_entry.get_str("objectsid") else {
                debug!("Domain {} has no SID, skipping well-known principals", domain_entry.key());
                continue;
            };
            let domain = domain_name_from_dn(&domain_entry.distinguished_name);
            let everyone_members = vec![
                TypedPrincipal::new(format!("{}-{}", domain_sid, DOMAIN_USERS_RID), Label::Group),
                TypedPrincipal::new(format!("{}-{}", domain_sid, DOMAIN_COMPUTERS_RID), Label::Group),
            ];

            principals.push(well_known_group(
                &domain,
                domain_sid,
                EVERYONE_SID,
                "EVERYONE",
                everyone_members.clone(),
            ));
            principals.push(well_known_group(
                &domain,
                domain_sid,
                AUTHENTICATED_USERS_SID,
                "AUTHENTICATED USERS",
                everyone_members,
            ));
            principals.push(well_known_group(
                &domain,
                domain_sid,
                ENTERPRISE_DC_SUFFIX,
                "ENTERPRISE DOMAIN CONTROLLERS",
                self.domain_controllers(domain_sid),
            ));
        }

        Ok(principals)
    }
}
