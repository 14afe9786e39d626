// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The index of all RIB tables. There is one table per (table id, namespace, afi, safi);
//! tables are created the first time they are asked for and live until the index is drained.

use crate::afi::{Afi, Safi};
use crate::rib::ribops::{RibNodeCleanup, RibTableOps};
use crate::table::{NodeCleanup, RouteTable, TableInfo};
use crate::vrf::{NS_DEFAULT, NsId, VrfContext, VrfId};
use std::cell::{BorrowError, BorrowMutError, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::rc::Rc;

#[allow(unused)]
use tracing::{debug, trace, warn};

/// Key of a table in the index. The derived order compares the table id first,
/// then the namespace, the afi and the safi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableKey {
    pub tableid: u32,
    pub ns_id: NsId,
    pub afi: Afi,
    pub safi: Safi,
}

impl TableKey {
    #[must_use]
    pub fn new(tableid: u32, ns_id: NsId, afi: Afi, safi: Safi) -> Self {
        Self {
            tableid,
            ns_id,
            afi,
            safi,
        }
    }
}

impl Display for TableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "table {} ns {} {}/{}",
            self.tableid, self.ns_id, self.afi, self.safi
        )
    }
}

/// Shared handle to a table owned by the index. Two handles refer to the same
/// table iff [`TableRef::ptr_eq`] holds.
#[derive(Clone)]
pub struct TableRef(Rc<RefCell<RouteTable>>);

impl TableRef {
    fn new(table: RouteTable) -> Self {
        Self(Rc::new(RefCell::new(table)))
    }
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, RouteTable> {
        self.0.borrow()
    }
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, RouteTable> {
        self.0.borrow_mut()
    }
    /// Borrow the table, failing if it is being modified
    pub fn try_borrow(&self) -> Result<Ref<'_, RouteTable>, BorrowError> {
        self.0.try_borrow()
    }
    /// Borrow the table mutably, failing if it is borrowed elsewhere
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, RouteTable>, BorrowMutError> {
        self.0.try_borrow_mut()
    }
    #[must_use]
    pub fn ptr_eq(&self, other: &TableRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for TableRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl std::fmt::Debug for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TableRef({:p})", Rc::as_ptr(&self.0))
    }
}

pub struct RouterTableIndex {
    tables: BTreeMap<TableKey, TableRef>,
    cleanup: Rc<dyn NodeCleanup>,
}

#[allow(clippy::new_without_default)]
#[allow(clippy::len_without_is_empty)]
impl RouterTableIndex {
    /// Create an empty index whose tables release their nodes with [`RibNodeCleanup`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_cleanup(Rc::new(RibNodeCleanup))
    }

    /// Create an empty index whose tables release their nodes with the given callback
    #[must_use]
    pub fn with_cleanup(cleanup: Rc<dyn NodeCleanup>) -> Self {
        Self {
            tables: BTreeMap::new(),
            cleanup,
        }
    }

    /// Set the node cleanup callback of the tables created from now on.
    /// Existing tables keep theirs.
    pub fn set_cleanup(&mut self, cleanup: Rc<dyn NodeCleanup>) {
        self.cleanup = cleanup;
    }

    //////////////////////////////////////////////////////////////////
    /// Find the table with the given id, afi and safi in the namespace of a vrf
    //////////////////////////////////////////////////////////////////
    #[must_use]
    pub fn find(&self, vrf: &VrfContext, tableid: u32, afi: Afi, safi: Safi) -> Option<TableRef> {
        let key = TableKey::new(tableid, vrf.ns_id, afi, safi);
        self.tables.get(&key).cloned()
    }

    //////////////////////////////////////////////////////////////////
    /// Get the table with the given id, afi and safi in the namespace of a vrf,
    /// creating it if it does not exist yet.
    //////////////////////////////////////////////////////////////////
    pub fn get_or_create(
        &mut self,
        vrf: &Rc<VrfContext>,
        tableid: u32,
        afi: Afi,
        safi: Safi,
    ) -> TableRef {
        let key = TableKey::new(tableid, vrf.ns_id, afi, safi);
        let cleanup = &self.cleanup;
        self.tables
            .entry(key)
            .or_insert_with(|| {
                let mut table = RouteTable::for_afi(afi);
                table.set_info(TableInfo {
                    vrf: vrf.clone(),
                    afi,
                    safi,
                });
                table.set_cleanup(cleanup.clone());
                debug!("Created {key} for vrf {}", vrf.name);
                TableRef::new(table)
            })
            .clone()
    }

    //////////////////////////////////////////////////////////////////
    /// Iterate over the tables of the default namespace, in key order
    //////////////////////////////////////////////////////////////////
    pub fn default_ns_tables(&self) -> impl Iterator<Item = (&TableKey, &TableRef)> + Clone {
        self.tables.iter().filter(|(key, _)| key.ns_id == NS_DEFAULT)
    }

    //////////////////////////////////////////////////////////////////
    /// Iterate over the tables owned by a vrf, in key order
    //////////////////////////////////////////////////////////////////
    pub fn tables_of_vrf(&self, vrfid: VrfId) -> impl Iterator<Item = (&TableKey, &TableRef)> {
        self.tables
            .iter()
            .filter(move |(_, table)| {
                table
                    .try_borrow()
                    .is_ok_and(|t| t.info().is_some_and(|i| i.vrf.vrfid == vrfid))
            })
    }

    /// Iterate over all tables, in key order
    pub fn iter(&self) -> impl Iterator<Item = (&TableKey, &TableRef)> {
        self.tables.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    //////////////////////////////////////////////////////////////////
    /// Remove and destroy all tables. Each table is first closed by the RIB, then its
    /// metadata is released and finally the table is finished. A table borrowed
    /// elsewhere can't be closed: it is only dropped from the index.
    /// Returns the number of tables removed.
    //////////////////////////////////////////////////////////////////
    pub fn drain_all(&mut self, rib: &mut dyn RibTableOps) -> usize {
        let mut num = 0;
        while let Some((key, tref)) = self.tables.pop_first() {
            num += 1;
            let Ok(mut table) = tref.try_borrow_mut() else {
                warn!("Can't release {key}: table is in use. Dropping it from the index");
                continue;
            };
            rib.close_table(&mut table);
            // metadata goes before the nodes: node cleanup gets no table info here
            drop(table.take_info());
            table.finish();
            trace!("Freed {key}");
        }
        debug!("Drained {num} tables");
        num
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rib::Rib;
    use crate::table::{NodeKey, Route, RouteNode, RouteProto};
    use crate::vrf::VRF_DEFAULT;
    use std::cell::Cell;
    use tracing_test::traced_test;

    const AFIS: [Afi; 3] = [Afi::Ip, Afi::Ip6, Afi::L2vpn];
    const SAFIS: [Safi; 7] = [
        Safi::Unicast,
        Safi::Multicast,
        Safi::MplsVpn,
        Safi::Encap,
        Safi::Evpn,
        Safi::LabeledUnicast,
        Safi::Flowspec,
    ];

    #[derive(Default)]
    struct CountingCleanup {
        released: Cell<usize>,
        with_info: Cell<usize>,
    }
    impl NodeCleanup for CountingCleanup {
        fn release(&self, info: Option<&TableInfo>, _key: &NodeKey, _node: RouteNode) {
            self.released.set(self.released.get() + 1);
            if info.is_some() {
                self.with_info.set(self.with_info.get() + 1);
            }
        }
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let vrf = VrfContext::default_vrf();
        let mut index = RouterTableIndex::new();
        let first = index.get_or_create(&vrf, 254, Afi::Ip, Safi::Unicast);
        for _ in 0..10 {
            let again = index.get_or_create(&vrf, 254, Afi::Ip, Safi::Unicast);
            assert!(again.ptr_eq(&first));
        }
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn find_before_and_after_creation() {
        let vrf = VrfContext::default_vrf();
        let mut index = RouterTableIndex::new();
        assert!(index.find(&vrf, 10, Afi::Ip6, Safi::Unicast).is_none());
        let created = index.get_or_create(&vrf, 10, Afi::Ip6, Safi::Unicast);
        let found = index
            .find(&vrf, 10, Afi::Ip6, Safi::Unicast)
            .expect("Should be there");
        assert_eq!(found, created);
        assert!(found.borrow().is_srcdest());
        assert!(found.borrow().has_cleanup());
        let info = found.borrow().info().cloned().expect("Should have info");
        assert_eq!(info.vrf.vrfid, VRF_DEFAULT);
        assert_eq!((info.afi, info.safi), (Afi::Ip6, Safi::Unicast));
    }

    #[test]
    fn keys_discriminate_every_field() {
        bolero::check!()
            .with_type()
            .cloned()
            .for_each(|(tableid, ns_id, afi, safi): (u32, u32, u8, u8)| {
                let afi = AFIS[usize::from(afi) % AFIS.len()];
                let safi = SAFIS[usize::from(safi) % SAFIS.len()];
                let vrf = VrfContext::new("red", 1, ns_id);
                let mut index = RouterTableIndex::new();
                let base = index.get_or_create(&vrf, tableid, afi, safi);

                let other_ns = VrfContext::new("blue", 2, ns_id.wrapping_add(1));
                let other_afi = AFIS[(AFIS.iter().position(|a| *a == afi).unwrap() + 1) % 3];
                let other_safi = SAFIS[(SAFIS.iter().position(|s| *s == safi).unwrap() + 1) % 7];
                let variants = [
                    index.get_or_create(&vrf, tableid.wrapping_add(1), afi, safi),
                    index.get_or_create(&other_ns, tableid, afi, safi),
                    index.get_or_create(&vrf, tableid, other_afi, safi),
                    index.get_or_create(&vrf, tableid, afi, other_safi),
                ];
                for variant in &variants {
                    assert!(!variant.ptr_eq(&base));
                }
                assert_eq!(index.len(), 5);
            });
    }

    #[test]
    fn ordering_is_by_table_ns_afi_safi() {
        let vrf0 = VrfContext::default_vrf();
        let vrf1 = VrfContext::new("red", 1, 7);
        let mut index = RouterTableIndex::new();
        index.get_or_create(&vrf1, 100, Afi::Ip, Safi::Unicast);
        index.get_or_create(&vrf0, 100, Afi::Ip6, Safi::Unicast);
        index.get_or_create(&vrf0, 100, Afi::Ip, Safi::Multicast);
        index.get_or_create(&vrf0, 100, Afi::Ip, Safi::Unicast);
        index.get_or_create(&vrf0, 5, Afi::L2vpn, Safi::Evpn);

        let keys: Vec<TableKey> = index.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                TableKey::new(5, 0, Afi::L2vpn, Safi::Evpn),
                TableKey::new(100, 0, Afi::Ip, Safi::Unicast),
                TableKey::new(100, 0, Afi::Ip, Safi::Multicast),
                TableKey::new(100, 0, Afi::Ip6, Safi::Unicast),
                TableKey::new(100, 7, Afi::Ip, Safi::Unicast),
            ]
        );

        let default_ns = index.default_ns_tables();
        assert_eq!(default_ns.clone().count(), 4);
        // restartable
        assert_eq!(default_ns.count(), 4);
        assert_eq!(index.tables_of_vrf(1).count(), 1);
    }

    #[test]
    fn drain_all_releases_everything() {
        let cleanup = Rc::new(CountingCleanup::default());
        let vrf = VrfContext::default_vrf();
        let mut index = RouterTableIndex::with_cleanup(cleanup.clone());
        let v4 = index.get_or_create(&vrf, 254, Afi::Ip, Safi::Unicast);
        let v6 = index.get_or_create(&vrf, 254, Afi::Ip6, Safi::Unicast);
        let route = Route::new(RouteProto::Static, 0);
        {
            let mut t4 = v4.borrow_mut();
            t4.add_route("10.0.0.0/8".parse().unwrap(), None, route.clone())
                .unwrap();
            t4.add_route("10.1.0.0/16".parse().unwrap(), None, route.clone())
                .unwrap();
        }
        v6.borrow_mut()
            .add_route("2001:db8::/32".parse().unwrap(), None, route)
            .unwrap();

        assert_eq!(index.drain_all(&mut Rib), 2);
        assert!(index.is_empty());
        assert_eq!(cleanup.released.get(), 3);
        // nodes are released after the metadata
        assert_eq!(cleanup.with_info.get(), 0);
        assert!(index.find(&vrf, 254, Afi::Ip, Safi::Unicast).is_none());

        // handles that outlived the index see finished tables
        assert!(v4.borrow().is_empty());
        assert!(v4.borrow().info().is_none());
        assert!(!v6.borrow().has_cleanup());
    }

    #[traced_test]
    #[test]
    fn drain_all_skips_tables_in_use() {
        let cleanup = Rc::new(CountingCleanup::default());
        let vrf = VrfContext::default_vrf();
        let mut index = RouterTableIndex::with_cleanup(cleanup.clone());
        let busy = index.get_or_create(&vrf, 254, Afi::Ip, Safi::Unicast);
        let free = index.get_or_create(&vrf, 255, Afi::Ip, Safi::Unicast);
        let route = Route::new(RouteProto::Static, 0);
        for table in [&busy, &free] {
            table
                .borrow_mut()
                .add_route("10.0.0.0/8".parse().unwrap(), None, route.clone())
                .unwrap();
        }

        let guard = busy.borrow();
        assert_eq!(index.tables_of_vrf(VRF_DEFAULT).count(), 2);
        assert_eq!(index.drain_all(&mut Rib), 2);
        assert!(index.is_empty());
        assert!(logs_contain("table is in use"));

        // the busy table was left alone, the other one was finished
        assert_eq!(guard.count(), 1);
        assert!(guard.info().is_some());
        assert!(free.borrow().is_empty());
        assert_eq!(cleanup.released.get(), 1);
    }

    #[test]
    fn cleanup_applies_to_new_tables() {
        let first = Rc::new(CountingCleanup::default());
        let second = Rc::new(CountingCleanup::default());
        let vrf = VrfContext::default_vrf();
        let mut index = RouterTableIndex::with_cleanup(first.clone());
        let old = index.get_or_create(&vrf, 1, Afi::Ip, Safi::Unicast);
        index.set_cleanup(second.clone());
        let new = index.get_or_create(&vrf, 2, Afi::Ip, Safi::Unicast);
        let route = Route::new(RouteProto::Static, 0);
        for table in [&old, &new] {
            table
                .borrow_mut()
                .add_route("10.0.0.0/8".parse().unwrap(), None, route.clone())
                .unwrap();
        }
        index.drain_all(&mut Rib);
        assert_eq!(first.released.get(), 1);
        assert_eq!(second.released.get(), 1);
    }
}
