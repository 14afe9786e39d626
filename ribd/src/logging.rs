// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use ordermap::OrderMap;
use std::str::FromStr;
#[allow(unused)]
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{EnvFilter, Registry, prelude::*, reload};

/// Targets known to the daemon, with their initial level
const KNOWN_TARGETS: [(&str, LevelFilter); 2] =
    [("ribd", LevelFilter::INFO), ("ribd_routing", LevelFilter::INFO)];

#[derive(Debug)]
pub(crate) struct LogControl {
    level: LevelFilter,
    targets: OrderMap<String, LevelFilter>,
    reload_filter: Option<reload::Handle<EnvFilter, Registry>>,
}

impl LogControl {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            targets: KNOWN_TARGETS
                .iter()
                .map(|(target, level)| ((*target).to_string(), *level))
                .collect(),
            reload_filter: None,
        }
    }

    /// Install the global subscriber. Levels can still be changed afterwards.
    pub fn init(&mut self) -> Result<(), String> {
        let (filter, reload_filter) = reload::Layer::new(self.env_filter()?);

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(true)
            .with_level(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| format!("Failed to initialize tracing subscriber: {e}"))?;

        self.reload_filter = Some(reload_filter);
        Ok(())
    }

    fn env_filter(&self) -> Result<EnvFilter, String> {
        let mut f = EnvFilter::new(self.level.to_string());
        for (target, level) in &self.targets {
            let directive: Directive = format!("{target}={level}")
                .parse()
                .map_err(|e| format!("Bad directive for target {target}: {e}"))?;
            f = f.add_directive(directive);
        }
        Ok(f)
    }

    fn reload(&self) {
        let Some(handle) = &self.reload_filter else {
            return;
        };
        match self.env_filter() {
            Ok(filter) => {
                if let Err(e) = handle.reload(filter) {
                    error!("Failed to reload tracing filter: {e}");
                }
            }
            Err(e) => error!("{e}"),
        }
    }

    /// Parse a string made of comma-separated target=level, where level=off,error,warn,info,debug,trace
    fn parse_tracing_config(input: &str) -> Result<OrderMap<String, LevelFilter>, String> {
        let mut result = OrderMap::new();

        for item in input.split(',') {
            let item = item.trim();
            if let Some((target, level)) = item.split_once('=') {
                let level = LevelFilter::from_str(level.trim())
                    .map_err(|e| format!("invalid level {}: {}", level.trim(), e))?;
                result.insert(target.trim().to_string(), level);
            } else {
                return Err("Invalid syntax: it should be target=loglevel".to_string());
            }
        }
        Ok(result)
    }

    pub fn setup_from_string(&mut self, input: &str) -> Result<(), String> {
        let config = Self::parse_tracing_config(input)?;

        if let Some(level) = config.get("default") {
            self.level = *level;
        }
        if let Some(level) = config.get("all") {
            self.targets.values_mut().for_each(|l| *l = *level);
        }
        // explicit targets override all=level
        for (target, level) in &config {
            if target != "default" && target != "all" {
                self.targets.insert(target.clone(), *level);
            }
        }
        self.reload();
        Ok(())
    }

    /// Generate a config string that would give the current tracing configuration
    pub fn as_config_string(&self) -> String {
        let mut out = format!("default={}", level_str(self.level));
        for (target, level) in &self.targets {
            out += format!(",{target}={}", level_str(*level)).as_str();
        }
        out
    }
}

// `LevelFilter` displays upper-case names
fn level_str(level: LevelFilter) -> String {
    level.to_string().to_lowercase()
}
