// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Module that implements the global state of a router instance and its lifecycle

use derive_builder::Builder;
use std::fmt::Display;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::afi::{Afi, Safi};
use crate::display::TableSummary;
use crate::errors::RouterError;
use crate::pbr::{PBR_HASH_INIT_SIZE, PbrRegistries};
use crate::queue::{MetaQueue, RibUpdate, WorkQueue};
use crate::rib::{Rib, RibTableOps, RouterTableIndex, TableRef};
use crate::seq::SequenceGenerator;
use crate::subsys::{Mlag, MlagHooks, Vxlan, VxlanHooks};
use crate::table::{NodeCleanup, RouteProto};
use crate::vrf::VrfContext;

/// Number of client packets processed in a single run
pub const ZAPI_PACKETS_TO_PROCESS: u32 = 1000;

/// Id of the main routing table
pub const RT_TABLE_ID_DEFAULT: u32 = 0;

/// Struct to configure the router state. N.B we derive a builder type `RouterParamsBuilder`
/// and provide defaults for each field.
#[derive(Builder, Debug, Clone)]
pub struct RouterParams {
    #[builder(setter(into), default = "zebra".to_string())]
    pub name: String,

    #[builder(default = RT_TABLE_ID_DEFAULT)]
    pub rtm_table_default: u32,

    #[builder(default = ZAPI_PACKETS_TO_PROCESS)]
    pub packets_to_process: u32,

    /// Initial capacity of the PBR registries. Raised to [`PBR_HASH_INIT_SIZE`] if lower.
    #[builder(default = PBR_HASH_INIT_SIZE)]
    pub pbr_hash_size: usize,
}

impl Default for RouterParams {
    fn default() -> Self {
        Self {
            name: "zebra".to_string(),
            rtm_table_default: RT_TABLE_ID_DEFAULT,
            packets_to_process: ZAPI_PACKETS_TO_PROCESS,
            pbr_hash_size: PBR_HASH_INIT_SIZE,
        }
    }
}

impl Display for RouterParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        writeln!(f, "Router config")?;
        writeln!(f, "  name              : {}", self.name)?;
        writeln!(f, "  default table     : {}", self.rtm_table_default)?;
        writeln!(f, "  packets to process: {}", self.packets_to_process)?;
        writeln!(f, "  pbr hash size     : {}", self.pbr_hash_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterStatus {
    Uninitialized,
    Initialized,
    Terminated,
}

impl Display for RouterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterStatus::Uninitialized => write!(f, "uninitialized"),
            RouterStatus::Initialized => write!(f, "initialized"),
            RouterStatus::Terminated => write!(f, "terminated"),
        }
    }
}

/// The global state of a router: its tables, sequence numbers, queues, PBR registries
/// and the subsystems started and stopped with it.
pub struct RouterState {
    params: RouterParams,
    status: RouterStatus,
    tables: RouterTableIndex,
    seq: Arc<SequenceGenerator>,
    rtm_table_default: u32,
    packets_to_process: u32,
    ribq: Option<WorkQueue<RibUpdate>>,
    mq: Option<MetaQueue<RibUpdate>>,
    pbr: Option<PbrRegistries>,
    rib: Box<dyn RibTableOps>,
    vxlan: Box<dyn VxlanHooks>,
    mlag: Box<dyn MlagHooks>,
}

impl RouterState {
    /// Create the state of a router. Nothing is usable until [`RouterState::init`] is called.
    #[must_use]
    pub fn new(params: RouterParams) -> Self {
        Self {
            params,
            status: RouterStatus::Uninitialized,
            tables: RouterTableIndex::new(),
            seq: Arc::new(SequenceGenerator::new()),
            rtm_table_default: RT_TABLE_ID_DEFAULT,
            packets_to_process: ZAPI_PACKETS_TO_PROCESS,
            ribq: None,
            mq: None,
            pbr: None,
            rib: Box::new(Rib),
            vxlan: Box::new(Vxlan::default()),
            mlag: Box::new(Mlag::default()),
        }
    }

    #[must_use]
    pub fn with_rib(mut self, rib: Box<dyn RibTableOps>) -> Self {
        self.rib = rib;
        self
    }
    #[must_use]
    pub fn with_vxlan(mut self, vxlan: Box<dyn VxlanHooks>) -> Self {
        self.vxlan = vxlan;
        self
    }
    #[must_use]
    pub fn with_mlag(mut self, mlag: Box<dyn MlagHooks>) -> Self {
        self.mlag = mlag;
        self
    }
    /// Set the callback used by tables to release their nodes. It applies to the
    /// tables created from now on: tables already created keep the one they were
    /// created with.
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: Rc<dyn NodeCleanup>) -> Self {
        self.tables.set_cleanup(cleanup);
        self
    }

    //////////////////////////////////////////////////////////////////
    /// Initialize the router state. Can only be called once.
    //////////////////////////////////////////////////////////////////
    pub fn init(&mut self) -> Result<(), RouterError> {
        if self.status != RouterStatus::Uninitialized {
            return Err(RouterError::InvalidTransition {
                op: "init",
                status: self.status,
            });
        }
        if self.params.packets_to_process == 0 {
            return Err(RouterError::InvalidConfig(
                "number of packets to process must be positive",
            ));
        }
        let name = &self.params.name;
        debug!("{name}: Initializing...");

        self.seq.reset();
        self.rtm_table_default = self.params.rtm_table_default;
        self.packets_to_process = self.params.packets_to_process;

        debug!("{name}: Initializing VXLAN and MLAG subsystems...");
        self.vxlan.init();
        self.mlag.init();

        debug!("{name}: Creating PBR registries...");
        self.pbr = Some(PbrRegistries::new(self.params.pbr_hash_size));

        self.status = RouterStatus::Initialized;
        info!("{name}: Successfully initialized with parameters:\n{}", self.params);
        Ok(())
    }

    //////////////////////////////////////////////////////////////////
    /// Tear down the router state. The order of the steps matters: tables
    /// are closed while queues and subsystems are still around and registries
    /// go last.
    //////////////////////////////////////////////////////////////////
    pub fn terminate(&mut self) -> Result<(), RouterError> {
        if self.status != RouterStatus::Initialized {
            return Err(RouterError::InvalidTransition {
                op: "terminate",
                status: self.status,
            });
        }
        let name = self.params.name.clone();
        debug!("{name}: Terminating...");

        let num_tables = self.tables.drain_all(self.rib.as_mut());

        if let Some(ribq) = self.ribq.take() {
            ribq.free();
        }
        if let Some(mq) = self.mq.take() {
            mq.free();
        }

        self.vxlan.disable();
        self.mlag.terminate();

        if let Some(pbr) = self.pbr.take() {
            let released = pbr.clean_and_destroy();
            debug!("{name}: Released PBR objects: {released:?}");
        }

        self.status = RouterStatus::Terminated;
        info!("{name}: Terminated ({num_tables} tables freed)");
        Ok(())
    }

    /// Hand the RIB work queue over to the router state
    pub fn attach_work_queue(&mut self, ribq: WorkQueue<RibUpdate>) {
        if let Some(old) = self.ribq.replace(ribq) {
            old.free();
        }
    }

    /// Hand the meta queue over to the router state
    pub fn attach_meta_queue(&mut self, mq: MetaQueue<RibUpdate>) {
        if let Some(old) = self.mq.replace(mq) {
            old.free();
        }
    }

    #[must_use]
    pub fn work_queue(&self) -> Option<&WorkQueue<RibUpdate>> {
        self.ribq.as_ref()
    }
    pub fn work_queue_mut(&mut self) -> Option<&mut WorkQueue<RibUpdate>> {
        self.ribq.as_mut()
    }
    #[must_use]
    pub fn meta_queue(&self) -> Option<&MetaQueue<RibUpdate>> {
        self.mq.as_ref()
    }
    pub fn meta_queue_mut(&mut self) -> Option<&mut MetaQueue<RibUpdate>> {
        self.mq.as_mut()
    }

    /// Look up a table. This never creates one.
    #[must_use]
    pub fn find_table(&self, vrf: &VrfContext, tableid: u32, afi: Afi, safi: Safi) -> Option<TableRef> {
        self.tables.find(vrf, tableid, afi, safi)
    }

    /// Get a table, creating it if needed. Tables can't be created once the router
    /// is terminated.
    pub fn get_table(
        &mut self,
        vrf: &Rc<VrfContext>,
        tableid: u32,
        afi: Afi,
        safi: Safi,
    ) -> Result<TableRef, RouterError> {
        if self.status == RouterStatus::Terminated {
            return Err(RouterError::InvalidTransition {
                op: "create tables",
                status: self.status,
            });
        }
        Ok(self.tables.get_or_create(vrf, tableid, afi, safi))
    }

    /// Get the next sequence number
    pub fn next_sequence(&self) -> u64 {
        self.seq.next()
    }

    /// Get a handle to the sequence generator, to hand out numbers from other threads
    #[must_use]
    pub fn sequencer(&self) -> Arc<SequenceGenerator> {
        self.seq.clone()
    }

    //////////////////////////////////////////////////////////////////
    /// Remove the routes of a protocol instance from the tables of the
    /// default namespace. Returns the number of routes removed.
    //////////////////////////////////////////////////////////////////
    pub fn score_proto(&mut self, proto: RouteProto, instance: u16) -> u64 {
        let mut total = 0;
        for (key, table) in self.tables.default_ns_tables() {
            let Ok(mut table) = table.try_borrow_mut() else {
                warn!("Not scoring {key}: table is in use");
                continue;
            };
            let score = self.rib.score_proto_table(proto, instance, &mut table);
            if score > 0 {
                debug!("Scored {score} routes of {proto} instance {instance} in {key}");
            }
            total += score;
        }
        total
    }

    /// Sweep the stale routes off the tables of the default namespace
    pub fn sweep_route(&mut self) {
        for (key, table) in self.tables.default_ns_tables() {
            let Ok(mut table) = table.try_borrow_mut() else {
                warn!("Not sweeping {key}: table is in use");
                continue;
            };
            debug!("Sweeping {key}");
            self.rib.sweep_table(&mut table);
        }
    }

    /// Render the summary of all tables
    #[must_use]
    pub fn show_table_summary(&self) -> String {
        TableSummary(&self.tables).to_string()
    }

    pub fn pbr(&self) -> Result<&PbrRegistries, RouterError> {
        self.pbr.as_ref().ok_or(RouterError::NotInitialized)
    }
    pub fn pbr_mut(&mut self) -> Result<&mut PbrRegistries, RouterError> {
        self.pbr.as_mut().ok_or(RouterError::NotInitialized)
    }

    #[must_use]
    pub fn status(&self) -> RouterStatus {
        self.status
    }
    #[must_use]
    pub fn params(&self) -> &RouterParams {
        &self.params
    }
    #[must_use]
    pub fn tables(&self) -> &RouterTableIndex {
        &self.tables
    }
    #[must_use]
    pub fn rtm_table_default(&self) -> u32 {
        self.rtm_table_default
    }
    #[must_use]
    pub fn packets_to_process(&self) -> u32 {
        self.packets_to_process
    }
}
