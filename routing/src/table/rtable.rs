// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Route tables. A route table maps prefixes to [`RouteNode`]s. Two variants exist:
//! a destination-keyed table and a source/destination-keyed one used for IPv6, where
//! each destination may in turn hold routes keyed by source prefix.

use crate::afi::{Afi, Safi};
use crate::errors::RouterError;
use crate::table::route::{Route, RouteNode};
use crate::vrf::VrfContext;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use prefix_trie::PrefixMap;
use std::fmt::Display;
use std::net::IpAddr;
use std::rc::Rc;

#[allow(unused)]
use tracing::{debug, trace, warn};

/// Metadata attached to a table by its creator
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub vrf: Rc<VrfContext>,
    pub afi: Afi,
    pub safi: Safi,
}

/// Identifies a node of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeKey {
    pub dst: IpNet,
    pub src: Option<Ipv6Net>,
}
impl NodeKey {
    #[must_use]
    pub fn dst(dst: IpNet) -> Self {
        Self { dst, src: None }
    }
}
impl Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dst)?;
        if let Some(src) = self.src {
            write!(f, " from {src}")?;
        }
        Ok(())
    }
}

/// Called by a [`RouteTable`] whenever one of its nodes is destroyed.
pub trait NodeCleanup {
    fn release(&self, info: Option<&TableInfo>, key: &NodeKey, node: RouteNode);
}

struct DestTable {
    v4: PrefixMap<Ipv4Net, RouteNode>,
    v6: PrefixMap<Ipv6Net, RouteNode>,
}

struct SrcDestNode {
    node: Option<RouteNode>,
    src: PrefixMap<Ipv6Net, RouteNode>,
}
impl SrcDestNode {
    fn new() -> Self {
        Self {
            node: None,
            src: PrefixMap::new(),
        }
    }
    fn is_empty(&self) -> bool {
        self.node.is_none() && self.src.is_empty()
    }
}

struct SrcDestTable {
    dst: PrefixMap<Ipv6Net, SrcDestNode>,
}

enum TableStore {
    Dest(DestTable),
    SrcDest(SrcDestTable),
}

pub struct RouteTable {
    store: TableStore,
    family: Option<Afi>,
    info: Option<TableInfo>,
    cleanup: Option<Rc<dyn NodeCleanup>>,
}

#[allow(clippy::new_without_default)]
impl RouteTable {
    /// Create a destination-keyed table
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: TableStore::Dest(DestTable {
                v4: PrefixMap::new(),
                v6: PrefixMap::new(),
            }),
            family: None,
            info: None,
            cleanup: None,
        }
    }

    /// Create a source/destination-keyed table
    #[must_use]
    pub fn new_srcdest() -> Self {
        Self {
            store: TableStore::SrcDest(SrcDestTable {
                dst: PrefixMap::new(),
            }),
            family: Some(Afi::Ip6),
            info: None,
            cleanup: None,
        }
    }

    /// Create the variant suitable for the given address family. IP tables
    /// only take prefixes of their own family.
    #[must_use]
    pub fn for_afi(afi: Afi) -> Self {
        match afi {
            Afi::Ip6 => Self::new_srcdest(),
            Afi::Ip => Self {
                family: Some(Afi::Ip),
                ..Self::new()
            },
            Afi::L2vpn => Self::new(),
        }
    }

    /// The address family the table is restricted to, if any
    #[must_use]
    pub fn family(&self) -> Option<Afi> {
        self.family
    }

    fn accepts(&self, prefix: &IpNet) -> bool {
        !matches!(
            (self.family, prefix),
            (Some(Afi::Ip), IpNet::V6(_)) | (Some(Afi::Ip6), IpNet::V4(_))
        )
    }

    #[must_use]
    pub fn is_srcdest(&self) -> bool {
        matches!(self.store, TableStore::SrcDest(_))
    }

    pub fn set_info(&mut self, info: TableInfo) {
        self.info = Some(info);
    }
    #[must_use]
    pub fn info(&self) -> Option<&TableInfo> {
        self.info.as_ref()
    }
    pub fn take_info(&mut self) -> Option<TableInfo> {
        self.info.take()
    }

    pub fn set_cleanup(&mut self, cleanup: Rc<dyn NodeCleanup>) {
        self.cleanup = Some(cleanup);
    }
    #[must_use]
    pub fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }

    fn release(&self, key: &NodeKey, node: RouteNode) {
        if let Some(cleanup) = &self.cleanup {
            cleanup.release(self.info.as_ref(), key, node);
        }
    }

    /// Add a route to the node for the given destination (and source) prefix,
    /// creating the node if needed.
    pub fn add_route(
        &mut self,
        dst: IpNet,
        src: Option<Ipv6Net>,
        route: Route,
    ) -> Result<(), RouterError> {
        if !self.accepts(&dst) {
            return Err(RouterError::FamilyMismatch(dst.to_string()));
        }
        let dst = dst.trunc();
        let src = src.map(|s| s.trunc());
        match &mut self.store {
            TableStore::Dest(table) => {
                if src.is_some() {
                    return Err(RouterError::SrcPrefixUnsupported);
                }
                let node = match dst {
                    IpNet::V4(p) => table.v4.entry(p).or_default(),
                    IpNet::V6(p) => table.v6.entry(p).or_default(),
                };
                node.add(route);
            }
            TableStore::SrcDest(table) => {
                let IpNet::V6(dst6) = dst else {
                    return Err(RouterError::FamilyMismatch(dst.to_string()));
                };
                let sdnode = table.dst.entry(dst6).or_insert_with(SrcDestNode::new);
                let node = match src {
                    Some(src) => sdnode.src.entry(src).or_default(),
                    None => sdnode.node.get_or_insert_with(RouteNode::new),
                };
                node.add(route);
            }
        }
        Ok(())
    }

    /// Get the node for the exact destination (and source) prefix
    #[must_use]
    pub fn get_node(&self, key: &NodeKey) -> Option<&RouteNode> {
        let dst = key.dst.trunc();
        match &self.store {
            TableStore::Dest(table) => {
                if key.src.is_some() {
                    return None;
                }
                match dst {
                    IpNet::V4(p) => table.v4.get(&p),
                    IpNet::V6(p) => table.v6.get(&p),
                }
            }
            TableStore::SrcDest(table) => {
                let IpNet::V6(dst6) = dst else {
                    return None;
                };
                let sdnode = table.dst.get(&dst6)?;
                match key.src {
                    Some(src) => sdnode.src.get(&src.trunc()),
                    None => sdnode.node.as_ref(),
                }
            }
        }
    }

    fn get_node_mut(&mut self, key: &NodeKey) -> Option<&mut RouteNode> {
        match &mut self.store {
            TableStore::Dest(table) => match key.dst {
                IpNet::V4(p) => table.v4.get_mut(&p),
                IpNet::V6(p) => table.v6.get_mut(&p),
            },
            TableStore::SrcDest(table) => {
                let IpNet::V6(dst6) = key.dst else {
                    return None;
                };
                let sdnode = table.dst.get_mut(&dst6)?;
                match key.src {
                    Some(src) => sdnode.src.get_mut(&src),
                    None => sdnode.node.as_mut(),
                }
            }
        }
    }

    /// Longest prefix match on the destination address. For source/destination tables,
    /// only routes without a source prefix are considered.
    #[must_use]
    pub fn lookup(&self, addr: IpAddr) -> Option<(IpNet, &RouteNode)> {
        match (&self.store, addr) {
            (TableStore::Dest(table), IpAddr::V4(a)) => table
                .v4
                .get_lpm(&Ipv4Net::from(a))
                .map(|(p, node)| (IpNet::V4(*p), node)),
            (TableStore::Dest(table), IpAddr::V6(a)) => table
                .v6
                .get_lpm(&Ipv6Net::from(a))
                .map(|(p, node)| (IpNet::V6(*p), node)),
            (TableStore::SrcDest(table), IpAddr::V6(a)) => {
                let (p, sdnode) = table.dst.get_lpm(&Ipv6Net::from(a))?;
                sdnode.node.as_ref().map(|node| (IpNet::V6(*p), node))
            }
            (TableStore::SrcDest(_), IpAddr::V4(_)) => None,
        }
    }

    /// Longest prefix match on destination, then on source. Falls back to the
    /// destination node without source if no source prefix covers `src`.
    #[must_use]
    pub fn lookup_srcdest(&self, dst: IpAddr, src: IpAddr) -> Option<(NodeKey, &RouteNode)> {
        let (TableStore::SrcDest(table), IpAddr::V6(dst), IpAddr::V6(src)) =
            (&self.store, dst, src)
        else {
            return self
                .lookup(dst)
                .map(|(prefix, node)| (NodeKey::dst(prefix), node));
        };
        let (p, sdnode) = table.dst.get_lpm(&Ipv6Net::from(dst))?;
        if let Some((s, node)) = sdnode.src.get_lpm(&Ipv6Net::from(src)) {
            let key = NodeKey {
                dst: IpNet::V6(*p),
                src: Some(*s),
            };
            return Some((key, node));
        }
        sdnode
            .node
            .as_ref()
            .map(|node| (NodeKey::dst(IpNet::V6(*p)), node))
    }

    /// Keys of all the nodes of this table
    #[must_use]
    pub fn node_keys(&self) -> Vec<NodeKey> {
        match &self.store {
            TableStore::Dest(table) => table
                .v4
                .iter()
                .map(|(p, _)| NodeKey::dst(IpNet::V4(*p)))
                .chain(table.v6.iter().map(|(p, _)| NodeKey::dst(IpNet::V6(*p))))
                .collect(),
            TableStore::SrcDest(table) => {
                let mut keys = Vec::with_capacity(table.dst.len());
                for (p, sdnode) in table.dst.iter() {
                    let dst = IpNet::V6(*p);
                    if sdnode.node.is_some() {
                        keys.push(NodeKey::dst(dst));
                    }
                    for (s, _) in sdnode.src.iter() {
                        keys.push(NodeKey { dst, src: Some(*s) });
                    }
                }
                keys
            }
        }
    }

    /// Remove a node, handing it to the cleanup callback. Returns true if the node existed.
    pub fn remove_node(&mut self, key: &NodeKey) -> bool {
        let key = NodeKey {
            dst: key.dst.trunc(),
            src: key.src.map(|s| s.trunc()),
        };
        let removed = match &mut self.store {
            TableStore::Dest(table) => match (key.dst, key.src) {
                (IpNet::V4(p), None) => table.v4.remove(&p),
                (IpNet::V6(p), None) => table.v6.remove(&p),
                (_, Some(_)) => None,
            },
            TableStore::SrcDest(table) => {
                let IpNet::V6(dst6) = key.dst else {
                    return false;
                };
                let Some(sdnode) = table.dst.get_mut(&dst6) else {
                    return false;
                };
                let removed = match key.src {
                    Some(src) => sdnode.src.remove(&src),
                    None => sdnode.node.take(),
                };
                if sdnode.is_empty() {
                    table.dst.remove(&dst6);
                }
                removed
            }
        };
        match removed {
            Some(node) => {
                self.release(&key, node);
                true
            }
            None => false,
        }
    }

    /// Visit every route of the table, keeping those for which `keep` returns true.
    /// Nodes left without routes are removed. Returns the number of routes removed.
    pub fn retain_routes<F: FnMut(&Route) -> bool>(&mut self, mut keep: F) -> usize {
        let mut removed = 0;
        for key in self.node_keys() {
            let Some(node) = self.get_node_mut(&key) else {
                continue;
            };
            removed += node.retain(&mut keep);
            if node.is_empty() {
                self.remove_node(&key);
            }
        }
        removed
    }

    /// Apply `f` to every route of the table
    pub fn for_each_route_mut<F: FnMut(&NodeKey, &mut Route)>(&mut self, mut f: F) {
        for key in self.node_keys() {
            if let Some(node) = self.get_node_mut(&key) {
                node.routes_mut().for_each(|route| f(&key, route));
            }
        }
    }

    /// Number of nodes in the table
    #[must_use]
    pub fn count(&self) -> usize {
        match &self.store {
            TableStore::Dest(table) => table.v4.len() + table.v6.len(),
            TableStore::SrcDest(table) => table
                .dst
                .iter()
                .map(|(_, sdnode)| usize::from(sdnode.node.is_some()) + sdnode.src.len())
                .sum(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Number of routes in the table, across all nodes
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.node_keys()
            .iter()
            .filter_map(|key| self.get_node(key))
            .map(RouteNode::len)
            .sum()
    }

    /// Destroy every node of the table, releasing them through the cleanup callback
    pub fn flush(&mut self) -> usize {
        let keys = self.node_keys();
        let num = keys.len();
        for key in &keys {
            self.remove_node(key);
        }
        num
    }

    /// Tear the table down: all nodes are released and the cleanup callback is dropped.
    /// Nothing else can be done with the table after this.
    pub fn finish(&mut self) {
        let num = self.flush();
        trace!("Finished table: released {num} nodes");
        self.cleanup.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::route::{RouteFlags, RouteProto};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);
    impl NodeCleanup for Recorder {
        fn release(&self, _info: Option<&TableInfo>, key: &NodeKey, _node: RouteNode) {
            self.0.borrow_mut().push(key.to_string());
        }
    }

    fn net(s: &str) -> IpNet {
        s.parse().expect("Bad prefix")
    }
    fn net6(s: &str) -> Ipv6Net {
        s.parse().expect("Bad prefix")
    }
    fn addr(s: &str) -> IpAddr {
        s.parse().expect("Bad address")
    }

    #[test]
    fn variant_follows_afi() {
        assert!(RouteTable::for_afi(Afi::Ip6).is_srcdest());
        assert!(!RouteTable::for_afi(Afi::Ip).is_srcdest());
        assert!(!RouteTable::for_afi(Afi::L2vpn).is_srcdest());
    }

    #[test]
    fn family_is_enforced() {
        let route = Route::new(RouteProto::Static, 0);
        let mut v4 = RouteTable::for_afi(Afi::Ip);
        assert_eq!(v4.family(), Some(Afi::Ip));
        assert_eq!(
            v4.add_route(net("2001:db8::/32"), None, route.clone()),
            Err(RouterError::FamilyMismatch("2001:db8::/32".to_string()))
        );
        assert!(v4.is_empty());
        v4.add_route(net("10.0.0.0/8"), None, route.clone()).unwrap();
        assert_eq!(v4.count(), 1);

        let mut v6 = RouteTable::for_afi(Afi::Ip6);
        assert_eq!(
            v6.add_route(net("10.0.0.0/8"), None, route.clone()),
            Err(RouterError::FamilyMismatch("10.0.0.0/8".to_string()))
        );

        // unrestricted tables take both families
        let mut any = RouteTable::new();
        assert_eq!(any.family(), None);
        any.add_route(net("10.0.0.0/8"), None, route.clone()).unwrap();
        any.add_route(net("2001:db8::/32"), None, route).unwrap();
        assert_eq!(any.count(), 2);
    }

    #[test]
    fn dest_table_lookups() {
        let mut table = RouteTable::new();
        let route = Route::new(RouteProto::Static, 0).with_nexthop(addr("10.0.0.1"));
        table.add_route(net("10.0.0.0/8"), None, route.clone()).unwrap();
        table.add_route(net("10.1.0.0/16"), None, route.clone()).unwrap();
        table.add_route(net("10.1.0.0/16"), None, route).unwrap();
        assert_eq!(table.count(), 2);
        assert_eq!(table.route_count(), 3);

        let (prefix, node) = table.lookup(addr("10.1.2.3")).expect("Should match");
        assert_eq!(prefix, net("10.1.0.0/16"));
        assert_eq!(node.len(), 2);

        let (prefix, _) = table.lookup(addr("10.2.2.3")).expect("Should match");
        assert_eq!(prefix, net("10.0.0.0/8"));
        assert!(table.lookup(addr("192.168.1.1")).is_none());

        // host bits are ignored
        assert!(table.get_node(&NodeKey::dst(net("10.1.9.9/16"))).is_some());

        // source prefixes are rejected
        let route = Route::new(RouteProto::Static, 0);
        assert_eq!(
            table.add_route(net("2001:db8::/32"), Some(net6("2001:db8::/48")), route),
            Err(RouterError::SrcPrefixUnsupported)
        );
    }

    #[test]
    fn srcdest_table_lookups() {
        let mut table = RouteTable::new_srcdest();
        let route = Route::new(RouteProto::Babel, 0);
        table
            .add_route(net("2001:db8::/32"), None, route.clone())
            .unwrap();
        table
            .add_route(net("2001:db8::/32"), Some(net6("fd00::/8")), route.clone())
            .unwrap();
        assert_eq!(table.count(), 2);

        let (key, _) = table
            .lookup_srcdest(addr("2001:db8::1"), addr("fd00::1"))
            .expect("Should match");
        assert_eq!(key.src, Some(net6("fd00::/8")));

        let (key, _) = table
            .lookup_srcdest(addr("2001:db8::1"), addr("2001:db8::2"))
            .expect("Should match");
        assert_eq!(key, NodeKey::dst(net("2001:db8::/32")));

        assert_eq!(
            table.add_route(net("10.0.0.0/8"), None, route),
            Err(RouterError::FamilyMismatch("10.0.0.0/8".to_string()))
        );
        assert!(table.lookup(addr("10.0.0.1")).is_none());
    }

    #[test]
    fn removal_invokes_cleanup() {
        let recorder = Rc::new(Recorder::default());
        let mut table = RouteTable::new_srcdest();
        table.set_cleanup(recorder.clone());
        let route = Route::new(RouteProto::Ospf6, 0);
        table
            .add_route(net("2001:db8::/32"), Some(net6("fd00::/8")), route.clone())
            .unwrap();
        table.add_route(net("::/0"), None, route).unwrap();

        assert!(table.remove_node(&NodeKey {
            dst: net("2001:db8::/32"),
            src: Some(net6("fd00::/8")),
        }));
        assert!(!table.remove_node(&NodeKey::dst(net("2001:db8::/32"))));
        assert_eq!(*recorder.0.borrow(), vec!["2001:db8::/32 from fd00::/8"]);

        table.finish();
        assert!(table.is_empty());
        assert!(!table.has_cleanup());
        assert_eq!(recorder.0.borrow().len(), 2);
    }

    #[test]
    fn retain_drops_empty_nodes() {
        let recorder = Rc::new(Recorder::default());
        let mut table = RouteTable::new();
        table.set_cleanup(recorder.clone());
        let stale = Route::new(RouteProto::Kernel, 0).with_flags(RouteFlags::SELFROUTE);
        let fresh = Route::new(RouteProto::Bgp, 0);
        table.add_route(net("192.0.2.0/24"), None, stale.clone()).unwrap();
        table.add_route(net("198.51.100.0/24"), None, stale).unwrap();
        table.add_route(net("198.51.100.0/24"), None, fresh).unwrap();

        let removed = table.retain_routes(|r| !r.flags.contains(RouteFlags::SELFROUTE));
        assert_eq!(removed, 2);
        assert_eq!(table.count(), 1);
        assert_eq!(*recorder.0.borrow(), vec!["192.0.2.0/24"]);
    }
}
