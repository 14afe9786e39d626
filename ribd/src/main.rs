// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]

mod args;
mod logging;

use crate::args::{CmdArgs, Parser};
use crate::logging::LogControl;

use routing::queue::{MetaQueue, WorkQueue};
use routing::{Afi, RouterParamsBuilder, RouterState, Safi, VrfContext};

use tracing::{error, info, level_filters::LevelFilter};

fn main() {
    /* parse cmd line args */
    let args = CmdArgs::parse();
    let mut logctl = LogControl::new(LevelFilter::INFO);
    if let Some(tracing) = args.tracing()
        && let Err(e) = logctl.setup_from_string(tracing)
    {
        eprintln!("Invalid tracing configuration: {e}");
        std::process::exit(1);
    }
    if args.show_tracing() {
        println!("{}", logctl.as_config_string());
        std::process::exit(0);
    }

    /* initialize logging */
    if let Err(e) = logctl.init() {
        eprintln!("{e}");
        std::process::exit(1);
    }
    info!("Starting ribd...");

    let (stop_tx, stop_rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || stop_tx.send(()).expect("Error sending SIGINT signal"))
        .expect("failed to set SIGINT handler");

    /* router parameters */
    let Ok(params) = RouterParamsBuilder::default()
        .rtm_table_default(args.default_table())
        .packets_to_process(args.packets_to_process())
        .build()
    else {
        error!("Bad router configuration");
        panic!("Bad router configuration");
    };

    let mut router = RouterState::new(params);
    if let Err(e) = router.init() {
        error!("Failed to initialize router: {e}");
        panic!("Failed to initialize router: {e}");
    }
    router.attach_work_queue(WorkQueue::new("route_node processing"));
    router.attach_meta_queue(MetaQueue::new());

    /* main tables of the default vrf */
    let vrf = VrfContext::default_vrf();
    let tableid = router.rtm_table_default();
    for afi in [Afi::Ip, Afi::Ip6] {
        if let Err(e) = router.get_table(&vrf, tableid, afi, Safi::Unicast) {
            error!("Failed to create main {afi} table: {e}");
        }
    }
    info!("Router is up ({} tables)", router.tables().len());

    stop_rx.recv().expect("failed to receive stop signal");
    info!("Routing tables:\n{}", router.show_table_summary());
    if let Err(e) = router.terminate() {
        error!("Failed to terminate router: {e}");
    }
    info!("Shutting down ribd");
}
