// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Module that implements Display for the table summary

use crate::rib::RouterTableIndex;
use std::fmt::Display;
use tracing::warn;

const SUMMARY_HEADER: &str =
    "VRF             NS ID    VRF ID     AFI            SAFI    Table      Count";

/// Summary of all the tables of an index, one row per table in key order
pub struct TableSummary<'a>(pub &'a RouterTableIndex);

impl Display for TableSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{SUMMARY_HEADER}")?;
        writeln!(f, "{}", "-".repeat(SUMMARY_HEADER.len()))?;
        for (key, table) in self.0.iter() {
            let Ok(table) = table.try_borrow() else {
                warn!("Leaving {key} out of the summary: table is being modified");
                continue;
            };
            let (name, vrfid) = table
                .info()
                .map_or(("", 0), |info| (info.vrf.name.as_str(), info.vrf.vrfid));
            writeln!(
                f,
                "{:<16}{:>5} {:>9} {:>7} {:>15} {:>8} {:>10}",
                name,
                key.ns_id,
                vrfid,
                key.afi,
                key.safi,
                key.tableid,
                table.count()
            )?;
        }
        Ok(())
    }
}
