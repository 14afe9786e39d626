// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Registries of policy-based routing objects: rules, ipsets, ipset entries and iptables.
//! Objects in distinct registries refer to each other by name, never by ownership.

pub mod ipset;
pub mod iptable;
pub mod rule;

use ahash::RandomState;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

#[allow(unused)]
use tracing::{debug, trace};

// re-exports
pub use ipset::{IpsetType, PbrIpset, PbrIpsetEntry};
pub use iptable::{IptableAction, PbrIptable};
pub use rule::{PbrFilter, PbrRule};

/// Minimum number of slots a registry is created with
pub const PBR_HASH_INIT_SIZE: usize = 8;

/// An object that can be stored in a [`PbrRegistry`]
pub trait PbrObject {
    /// Content-derived identity of the object
    type Key: Hash + Eq + Clone + Debug;
    const KIND: &'static str;

    fn key(&self) -> Self::Key;

    /// Release any resources held by the object
    fn release(self);
}

pub struct PbrRegistry<T: PbrObject> {
    name: &'static str,
    entries: HashMap<T::Key, T, RandomState>,
}

#[allow(clippy::len_without_is_empty)]
impl<T: PbrObject> PbrRegistry<T> {
    #[must_use]
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(PBR_HASH_INIT_SIZE);
        Self {
            name,
            entries: HashMap::with_capacity_and_hasher(capacity, RandomState::with_seed(0)),
        }
    }
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Store an object. If an equal one was there, it is replaced and returned.
    pub fn insert(&mut self, object: T) -> Option<T> {
        let key = object.key();
        trace!("{}: inserting {} {key:?}", self.name, T::KIND);
        self.entries.insert(key, object)
    }
    #[must_use]
    pub fn find(&self, key: &T::Key) -> Option<&T> {
        self.entries.get(key)
    }
    pub fn find_mut(&mut self, key: &T::Key) -> Option<&mut T> {
        self.entries.get_mut(key)
    }
    #[must_use]
    pub fn contains(&self, key: &T::Key) -> bool {
        self.entries.contains_key(key)
    }
    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        self.entries.remove(key)
    }
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Release every object and destroy the registry. Returns the number of objects released.
    pub fn clean_and_destroy(self) -> usize {
        let name = self.name;
        let mut num = 0;
        for (_, object) in self.entries {
            object.release();
            num += 1;
        }
        debug!("{name}: released {num} objects");
        num
    }
}

/// Number of objects released from each registry at teardown
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PbrReleased {
    pub ipset_entries: usize,
    pub ipsets: usize,
    pub iptables: usize,
    pub rules: usize,
}

/// The four PBR registries of the router
pub struct PbrRegistries {
    pub rules: PbrRegistry<PbrRule>,
    pub ipsets: PbrRegistry<PbrIpset>,
    pub ipset_entries: PbrRegistry<PbrIpsetEntry>,
    pub iptables: PbrRegistry<PbrIptable>,
}

impl PbrRegistries {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            rules: PbrRegistry::with_capacity("Rules Hash", capacity),
            ipsets: PbrRegistry::with_capacity("IPset Hash", capacity),
            ipset_entries: PbrRegistry::with_capacity("IPset Hash Entry", capacity),
            iptables: PbrRegistry::with_capacity("IPtable Hash Entry", capacity),
        }
    }

    #[must_use]
    pub fn ipset_by_name(&self, name: &str) -> Option<&PbrIpset> {
        self.ipsets.iter().find(|ipset| ipset.name == name)
    }
    pub fn ipset_entries_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PbrIpsetEntry> {
        self.ipset_entries
            .iter()
            .filter(move |entry| entry.ipset_name == name)
    }
    pub fn iptables_using<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PbrIptable> {
        self.iptables
            .iter()
            .filter(move |iptable| iptable.ipset_name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
            && self.ipsets.is_empty()
            && self.ipset_entries.is_empty()
            && self.iptables.is_empty()
    }

    fn log_ipset_usage(&self) {
        for ipset in self.ipsets.iter() {
            debug!(
                "ipset {} ({}): {} entries, referenced by {} iptables",
                ipset.name,
                ipset.ipset_type,
                self.ipset_entries_of(&ipset.name).count(),
                self.iptables_using(&ipset.name).count()
            );
        }
    }

    //////////////////////////////////////////////////////////////////
    /// Release all objects and destroy the registries. Ipset entries go first, then
    /// ipsets, iptables and rules. Anything reported across registries is reported
    /// before the first registry is destroyed.
    //////////////////////////////////////////////////////////////////
    pub fn clean_and_destroy(self) -> PbrReleased {
        self.log_ipset_usage();
        let Self {
            rules,
            ipsets,
            ipset_entries,
            iptables,
        } = self;
        PbrReleased {
            ipset_entries: ipset_entries.clean_and_destroy(),
            ipsets: ipsets.clean_and_destroy(),
            iptables: iptables.clean_and_destroy(),
            rules: rules.clean_and_destroy(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::afi::Afi;
    use tracing_test::traced_test;

    pub(crate) fn build_sample_registries() -> PbrRegistries {
        let mut pbr = PbrRegistries::new(PBR_HASH_INIT_SIZE);
        pbr.ipsets
            .insert(PbrIpset::new(1, "blocked", IpsetType::Net, Afi::Ip, 0));
        pbr.ipsets
            .insert(PbrIpset::new(2, "voice", IpsetType::NetPort, Afi::Ip, 0));
        for unique in 10..13 {
            let mut entry = PbrIpsetEntry::new(unique, "blocked");
            entry.dst = Some(format!("192.0.2.{unique}/32").parse().unwrap());
            pbr.ipset_entries.insert(entry);
        }
        pbr.ipset_entries.insert(PbrIpsetEntry::new(20, "voice"));
        pbr.iptables
            .insert(PbrIptable::new(30, "blocked", IptableAction::Drop));
        let mut rule = PbrRule::new(40, 10, 100, "eth0");
        rule.table = 1000;
        pbr.rules.insert(rule);
        pbr
    }

    /// Check that every step is logged, after the one before it
    pub(crate) fn logged_in_order(lines: &[&str], steps: &[&str]) -> Result<(), String> {
        let mut last: Option<(usize, &str)> = None;
        for step in steps {
            let pos = lines
                .iter()
                .position(|line| line.contains(step))
                .ok_or_else(|| format!("'{step}' was not logged"))?;
            if let Some((prev, prev_step)) = last
                && pos < prev
            {
                return Err(format!("'{step}' was logged before '{prev_step}'"));
            }
            last = Some((pos, *step));
        }
        Ok(())
    }

    #[test]
    fn registry_basics() {
        let mut registry: PbrRegistry<PbrIpset> = PbrRegistry::with_capacity("IPset Hash", 0);
        assert!(registry.capacity() >= PBR_HASH_INIT_SIZE);
        assert_eq!(registry.name(), "IPset Hash");

        let ipset = PbrIpset::new(1, "blocked", IpsetType::Net, Afi::Ip, 0);
        let key = ipset.key();
        assert!(registry.insert(ipset.clone()).is_none());
        assert_eq!(registry.insert(ipset.clone()), Some(ipset.clone()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find(&key), Some(&ipset));

        registry.find_mut(&key).unwrap().installed = true;
        assert!(registry.find(&key).unwrap().installed);

        // differing content gives differing keys
        let other = PbrIpset::new(1, "blocked", IpsetType::NetNet, Afi::Ip, 0);
        assert!(!registry.contains(&other.key()));

        assert!(registry.remove(&key).is_some());
        assert!(registry.remove(&key).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn cross_registry_lookups() {
        let pbr = build_sample_registries();
        assert_eq!(pbr.ipset_by_name("voice").map(|s| s.unique), Some(2));
        assert!(pbr.ipset_by_name("nope").is_none());
        assert_eq!(pbr.ipset_entries_of("blocked").count(), 3);
        assert_eq!(pbr.ipset_entries_of("voice").count(), 1);
        assert_eq!(pbr.iptables_using("blocked").count(), 1);
        assert_eq!(pbr.iptables_using("voice").count(), 0);
    }

    #[traced_test]
    #[test]
    fn clean_and_destroy_releases_all() {
        let pbr = build_sample_registries();
        let released = pbr.clean_and_destroy();
        assert_eq!(
            released,
            PbrReleased {
                ipset_entries: 4,
                ipsets: 2,
                iptables: 1,
                rules: 1,
            }
        );
        assert!(logs_contain("ipset blocked (hash:net): 3 entries, referenced by 1 iptables"));
        assert!(logs_contain("IPset Hash Entry: released 4 objects"));
        logs_assert(|lines: &[&str]| {
            logged_in_order(
                lines,
                &[
                    "ipset blocked (hash:net)",
                    "IPset Hash Entry: released 4 objects",
                    "IPset Hash: released 2 objects",
                    "IPtable Hash Entry: released 1 objects",
                    "Rules Hash: released 1 objects",
                ],
            )
        });
    }
}
