// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! VRF context as seen by the router table registry

use std::fmt::Display;
use std::rc::Rc;

/// Every VRF is univocally identified with a numerical VRF id
pub type VrfId = u32;

/// Network namespace identifier
pub type NsId = u32;

/// The default network namespace
pub const NS_DEFAULT: NsId = 0;

/// The id of the default VRF
pub const VRF_DEFAULT: VrfId = 0;

/// The owning context of RIB tables. Created and owned by the VRF layer; tables
/// keep a reference to it in their metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrfContext {
    pub name: String,
    pub vrfid: VrfId,
    pub ns_id: NsId,
}

impl VrfContext {
    #[must_use]
    pub fn new(name: &str, vrfid: VrfId, ns_id: NsId) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_owned(),
            vrfid,
            ns_id,
        })
    }

    /// The default VRF, living in the default namespace
    #[must_use]
    pub fn default_vrf() -> Rc<Self> {
        Self::new("default", VRF_DEFAULT, NS_DEFAULT)
    }

    #[must_use]
    pub fn is_default_ns(&self) -> bool {
        self.ns_id == NS_DEFAULT
    }
}

impl Display for VrfContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (id: {}, ns: {})", self.name, self.vrfid, self.ns_id)
    }
}
