// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ipsets and ipset entries

use super::PbrObject;
use crate::afi::Afi;
use crate::vrf::VrfId;
use ipnet::IpNet;
use std::fmt::Display;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpsetType {
    Net,
    NetNet,
    NetPort,
    NetPortNet,
}

impl Display for IpsetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpsetType::Net => write!(f, "hash:net"),
            IpsetType::NetNet => write!(f, "hash:net,net"),
            IpsetType::NetPort => write!(f, "hash:net,port"),
            IpsetType::NetPortNet => write!(f, "hash:net,port,net"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbrIpset {
    pub unique: u32,
    pub name: String,
    pub ipset_type: IpsetType,
    pub family: Afi,
    pub vrfid: VrfId,
    pub installed: bool,
}

impl PbrIpset {
    #[must_use]
    pub fn new(unique: u32, name: &str, ipset_type: IpsetType, family: Afi, vrfid: VrfId) -> Self {
        Self {
            unique,
            name: name.to_owned(),
            ipset_type,
            family,
            vrfid,
            installed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PbrIpsetKey {
    unique: u32,
    ipset_type: IpsetType,
    name: String,
}

impl PbrObject for PbrIpset {
    type Key = PbrIpsetKey;
    const KIND: &'static str = "ipset";

    fn key(&self) -> Self::Key {
        PbrIpsetKey {
            unique: self.unique,
            ipset_type: self.ipset_type,
            name: self.name.clone(),
        }
    }
    fn release(self) {
        if self.installed {
            debug!("Uninstalling ipset {} ({})", self.name, self.ipset_type);
        }
    }
}

/// An entry of an ipset. The entry refers to its ipset by name.
#[derive(Debug, Clone, PartialEq)]
pub struct PbrIpsetEntry {
    pub unique: u32,
    pub ipset_name: String,
    pub src: Option<IpNet>,
    pub dst: Option<IpNet>,
    pub src_ports: (u16, u16),
    pub dst_ports: (u16, u16),
    pub ip_proto: u8,
    pub installed: bool,
}

impl PbrIpsetEntry {
    #[must_use]
    pub fn new(unique: u32, ipset_name: &str) -> Self {
        Self {
            unique,
            ipset_name: ipset_name.to_owned(),
            src: None,
            dst: None,
            src_ports: (0, 0),
            dst_ports: (0, 0),
            ip_proto: 0,
            installed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PbrIpsetEntryKey {
    unique: u32,
    ipset_name: String,
    src: Option<IpNet>,
    dst: Option<IpNet>,
    src_ports: (u16, u16),
    dst_ports: (u16, u16),
    ip_proto: u8,
}

impl PbrObject for PbrIpsetEntry {
    type Key = PbrIpsetEntryKey;
    const KIND: &'static str = "ipset entry";

    fn key(&self) -> Self::Key {
        PbrIpsetEntryKey {
            unique: self.unique,
            ipset_name: self.ipset_name.clone(),
            src: self.src,
            dst: self.dst,
            src_ports: self.src_ports,
            dst_ports: self.dst_ports,
            ip_proto: self.ip_proto,
        }
    }
    fn release(self) {
        if self.installed {
            debug!(
                "Uninstalling entry {} of ipset {}",
                self.unique, self.ipset_name
            );
        }
    }
}
