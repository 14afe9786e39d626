// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

pub(crate) use clap::Parser;
use routing::{RT_TABLE_ID_DEFAULT, ZAPI_PACKETS_TO_PROCESS};

#[derive(Parser, Debug)]
#[command(name = "ribd")]
#[command(version = "0.1")]
#[command(about = "Routing information base daemon", long_about = None)]
pub(crate) struct CmdArgs {
    #[arg(
        long,
        value_name = "TABLE-ID",
        default_value_t = RT_TABLE_ID_DEFAULT,
        help = "Id of the main routing table"
    )]
    default_table: u32,

    #[arg(
        long,
        value_name = "N",
        default_value_t = ZAPI_PACKETS_TO_PROCESS,
        value_parser = clap::value_parser!(u32).range(1..=10000),
        help = "Number of client packets to process in a single run, in [1..10000]"
    )]
    packets_to_process: u32,

    #[arg(
        long,
        value_name = "tracing configuration",
        help = "Tracing config string as comma-separated sequence of target=level, with level one in [off,error,warn,info,debug,trace].
Passing default=level sets the default log-level.
Passing all=level sets the log-level of all known targets to level.
E.g. default=error,all=info,ribd_routing=debug"
    )]
    tracing: Option<String>,

    #[arg(
        long,
        default_value_t = false,
        help = "Show the resulting tracing configuration and exit"
    )]
    show_tracing: bool,
}

impl CmdArgs {
    pub fn default_table(&self) -> u32 {
        self.default_table
    }
    pub fn packets_to_process(&self) -> u32 {
        self.packets_to_process
    }
    pub fn tracing(&self) -> Option<&String> {
        self.tracing.as_ref()
    }
    pub fn show_tracing(&self) -> bool {
        self.show_tracing
    }
}
