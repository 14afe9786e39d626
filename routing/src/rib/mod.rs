// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! RIB collaborators of the router table registry

pub mod ribops;
pub mod tableindex;

// re-exports
pub use ribops::{Rib, RibNodeCleanup, RibTableOps};
pub use tableindex::{RouterTableIndex, TableKey, TableRef};
