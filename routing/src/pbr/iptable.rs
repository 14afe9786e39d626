// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Iptables: firewall rules matching on an ipset and marking or dropping traffic

use super::PbrObject;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IptableAction {
    Drop,
    Forward,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbrIptable {
    pub unique: u32,
    pub ipset_name: String,
    pub action: IptableAction,
    pub fwmark: u32,
    pub table: u32,
    pub filter_bm: u32,
    pub interfaces: Vec<String>,
    pub installed: bool,
}

impl PbrIptable {
    #[must_use]
    pub fn new(unique: u32, ipset_name: &str, action: IptableAction) -> Self {
        Self {
            unique,
            ipset_name: ipset_name.to_owned(),
            action,
            fwmark: 0,
            table: 0,
            filter_bm: 0,
            interfaces: vec![],
            installed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PbrIptableKey {
    unique: u32,
    ipset_name: String,
    action: IptableAction,
    fwmark: u32,
    table: u32,
    filter_bm: u32,
}

impl PbrObject for PbrIptable {
    type Key = PbrIptableKey;
    const KIND: &'static str = "iptable";

    fn key(&self) -> Self::Key {
        PbrIptableKey {
            unique: self.unique,
            ipset_name: self.ipset_name.clone(),
            action: self.action,
            fwmark: self.fwmark,
            table: self.table,
            filter_bm: self.filter_bm,
        }
    }
    fn release(self) {
        if self.installed {
            debug!(
                "Uninstalling iptable {} on ipset {} ({} interfaces)",
                self.unique,
                self.ipset_name,
                self.interfaces.len()
            );
        }
    }
}
