// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A library to keep the routing tables and the global state of a routing daemon.

#![deny(clippy::all)]
#![allow(clippy::similar_names)]

pub mod afi;
mod display;
mod errors;
pub mod pbr;
pub mod queue;
pub mod rib;
mod router;
pub mod seq;
pub mod subsys;
pub mod table;
pub mod vrf;

// re-exports
pub use afi::{Afi, Safi};
pub use display::TableSummary;
pub use errors::RouterError;
pub use rib::{RouterTableIndex, TableKey, TableRef};
pub use router::{
    RT_TABLE_ID_DEFAULT, RouterParams, RouterParamsBuilder, RouterState, RouterStatus,
    ZAPI_PACKETS_TO_PROCESS,
};
pub use vrf::VrfContext;
