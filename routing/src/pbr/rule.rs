// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Policy routing rules

use super::PbrObject;
use crate::vrf::VrfId;
use ipnet::IpNet;
use tracing::debug;

/// What a rule matches on. Zeroed fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PbrFilter {
    pub src: Option<IpNet>,
    pub dst: Option<IpNet>,
    pub src_port: u16,
    pub dst_port: u16,
    pub fwmark: u32,
    pub dsfield: u8,
    pub ip_proto: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbrRule {
    pub unique: u32,
    pub seq: u32,
    pub priority: u32,
    pub ifname: String,
    pub vrfid: VrfId,
    pub filter: PbrFilter,
    /// Table to look up when the rule matches
    pub table: u32,
    pub installed: bool,
}

impl PbrRule {
    #[must_use]
    pub fn new(unique: u32, seq: u32, priority: u32, ifname: &str) -> Self {
        Self {
            unique,
            seq,
            priority,
            ifname: ifname.to_owned(),
            vrfid: 0,
            filter: PbrFilter::default(),
            table: 0,
            installed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PbrRuleKey {
    unique: u32,
    seq: u32,
    priority: u32,
    ifname: String,
    vrfid: VrfId,
    filter: PbrFilter,
    table: u32,
}

impl PbrObject for PbrRule {
    type Key = PbrRuleKey;
    const KIND: &'static str = "rule";

    fn key(&self) -> Self::Key {
        PbrRuleKey {
            unique: self.unique,
            seq: self.seq,
            priority: self.priority,
            ifname: self.ifname.clone(),
            vrfid: self.vrfid,
            filter: self.filter.clone(),
            table: self.table,
        }
    }
    fn release(self) {
        if self.installed {
            debug!(
                "Uninstalling rule seq {} prio {} on {} (table {})",
                self.seq, self.priority, self.ifname, self.table
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_with_distinct_filters_differ() {
        let a = PbrRule::new(1, 10, 100, "eth0");
        let mut b = a.clone();
        b.filter.dst = Some("203.0.113.0/24".parse().unwrap());
        assert_ne!(a.key(), b.key());
        b.filter = PbrFilter::default();
        assert_eq!(a.key(), b.key());
    }
}
