// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! RIB tables and their content

pub mod route;
pub mod rtable;

// re-exports
pub use route::{Route, RouteFlags, RouteNode, RouteProto};
pub use rtable::{NodeCleanup, NodeKey, RouteTable, TableInfo};
