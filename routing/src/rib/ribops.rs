// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-table operations that the router table registry delegates to the RIB

use crate::table::{NodeCleanup, NodeKey, RouteFlags, RouteNode, RouteProto, RouteTable, TableInfo};

#[allow(unused)]
use tracing::{debug, trace};

/// The operations the RIB provides on individual tables.
pub trait RibTableOps {
    /// Flush a table that is about to be destroyed: routes get withdrawn from the
    /// forwarding plane. The routes themselves remain until the table is finished.
    fn close_table(&mut self, table: &mut RouteTable);

    /// Remove the routes of the given protocol instance from a table and tell how many
    /// were removed.
    fn score_proto_table(&mut self, proto: RouteProto, instance: u16, table: &mut RouteTable)
    -> u64;

    /// Remove routes left over by a previous instance of the daemon
    fn sweep_table(&mut self, table: &mut RouteTable);
}

/// Default RIB table operations
#[derive(Debug, Default)]
pub struct Rib;

impl RibTableOps for Rib {
    fn close_table(&mut self, table: &mut RouteTable) {
        let mut uninstalled = 0;
        table.for_each_route_mut(|key, route| {
            if route.flags.contains(RouteFlags::INSTALLED) {
                trace!("Uninstalling {key} {route}");
                route.flags.remove(RouteFlags::INSTALLED | RouteFlags::SELECTED);
                uninstalled += 1;
            }
        });
        if let Some(info) = table.info() {
            debug!(
                "Closed table of vrf {} afi {} safi {}: {uninstalled} routes uninstalled",
                info.vrf.name, info.afi, info.safi
            );
        }
    }

    fn score_proto_table(
        &mut self,
        proto: RouteProto,
        instance: u16,
        table: &mut RouteTable,
    ) -> u64 {
        let removed = table.retain_routes(|route| !route.is_from(proto, instance));
        if removed > 0 {
            debug!("Removed {removed} routes of {proto} instance {instance}");
        }
        removed as u64
    }

    fn sweep_table(&mut self, table: &mut RouteTable) {
        let removed = table.retain_routes(|route| !route.flags.contains(RouteFlags::SELFROUTE));
        if removed > 0 {
            debug!("Swept {removed} stale routes");
        }
    }
}

/// Node cleanup installed by the registry on every table it creates. Any routes still
/// held by a node at destruction time are dropped with it.
#[derive(Debug, Default)]
pub struct RibNodeCleanup;

impl NodeCleanup for RibNodeCleanup {
    fn release(&self, info: Option<&TableInfo>, key: &NodeKey, node: RouteNode) {
        if node.is_empty() {
            return;
        }
        match info {
            Some(info) => trace!(
                "Releasing {} routes of {key} in vrf {} ({}/{})",
                node.len(),
                info.vrf.name,
                info.afi,
                info.safi
            ),
            None => trace!("Releasing {} routes of {key}", node.len()),
        }
    }
}
