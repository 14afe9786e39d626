// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Routes stored in RIB tables

use crate::errors::RouterError;
use bitflags::bitflags;
use std::fmt::Display;
use std::net::IpAddr;

/// Origin of a route. Values follow the numbering used on the wire by routing
/// protocol daemons when they talk to the RIB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RouteProto {
    System = 0,
    Kernel = 1,
    Connect = 2,
    Static = 3,
    Rip = 4,
    Ripng = 5,
    Ospf = 6,
    Ospf6 = 7,
    Isis = 8,
    Bgp = 9,
    Pim = 10,
    Eigrp = 11,
    Nhrp = 12,
    Table = 15,
    Babel = 22,
    Sharp = 23,
    Pbr = 24,
    Openfabric = 26,
}

impl TryFrom<u8> for RouteProto {
    type Error = RouterError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let proto = match value {
            0 => RouteProto::System,
            1 => RouteProto::Kernel,
            2 => RouteProto::Connect,
            3 => RouteProto::Static,
            4 => RouteProto::Rip,
            5 => RouteProto::Ripng,
            6 => RouteProto::Ospf,
            7 => RouteProto::Ospf6,
            8 => RouteProto::Isis,
            9 => RouteProto::Bgp,
            10 => RouteProto::Pim,
            11 => RouteProto::Eigrp,
            12 => RouteProto::Nhrp,
            15 => RouteProto::Table,
            22 => RouteProto::Babel,
            23 => RouteProto::Sharp,
            24 => RouteProto::Pbr,
            26 => RouteProto::Openfabric,
            _ => return Err(RouterError::InvalidRouteProto(value)),
        };
        Ok(proto)
    }
}

impl Display for RouteProto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RouteProto::System => "system",
            RouteProto::Kernel => "kernel",
            RouteProto::Connect => "connected",
            RouteProto::Static => "static",
            RouteProto::Rip => "rip",
            RouteProto::Ripng => "ripng",
            RouteProto::Ospf => "ospf",
            RouteProto::Ospf6 => "ospf6",
            RouteProto::Isis => "isis",
            RouteProto::Bgp => "bgp",
            RouteProto::Pim => "pim",
            RouteProto::Eigrp => "eigrp",
            RouteProto::Nhrp => "nhrp",
            RouteProto::Table => "table",
            RouteProto::Babel => "babel",
            RouteProto::Sharp => "sharp",
            RouteProto::Pbr => "pbr",
            RouteProto::Openfabric => "openfabric",
        };
        f.pad(name)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RouteFlags: u32 {
        /// Route found in the kernel that a previous instance of the daemon installed
        const SELFROUTE = 1 << 0;
        /// Route chosen as best among the routes of its node
        const SELECTED = 1 << 1;
        /// Route installed in the forwarding plane
        const INSTALLED = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub proto: RouteProto,
    pub instance: u16,
    pub distance: u8,
    pub metric: u32,
    pub flags: RouteFlags,
    pub nexthops: Vec<IpAddr>,
}

impl Route {
    #[must_use]
    pub fn new(proto: RouteProto, instance: u16) -> Self {
        Self {
            proto,
            instance,
            distance: 0,
            metric: 0,
            flags: RouteFlags::empty(),
            nexthops: Vec::with_capacity(1),
        }
    }
    #[must_use]
    pub fn with_nexthop(mut self, nexthop: IpAddr) -> Self {
        self.nexthops.push(nexthop);
        self
    }
    #[must_use]
    pub fn with_flags(mut self, flags: RouteFlags) -> Self {
        self.flags |= flags;
        self
    }
    #[must_use]
    pub fn is_from(&self, proto: RouteProto, instance: u16) -> bool {
        self.proto == proto && self.instance == instance
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.proto)?;
        if self.instance != 0 {
            write!(f, "[{}]", self.instance)?;
        }
        write!(f, " [{}/{}]", self.distance, self.metric)?;
        for nhop in &self.nexthops {
            write!(f, " via {nhop}")?;
        }
        Ok(())
    }
}

/// The set of routes known for one (destination, source) prefix of a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteNode {
    routes: Vec<Route>,
}

impl RouteNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
    }
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
    pub fn routes_mut(&mut self) -> impl Iterator<Item = &mut Route> {
        self.routes.iter_mut()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
    /// Keep the routes for which `keep` returns true. Returns the number of routes removed.
    pub fn retain<F: FnMut(&Route) -> bool>(&mut self, mut keep: F) -> usize {
        let before = self.routes.len();
        self.routes.retain(|r| keep(r));
        before - self.routes.len()
    }
}
