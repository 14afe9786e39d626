// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Lifecycle hooks of the subsystems started and stopped along with the router

use tracing::debug;

/// Lifecycle of the VXLAN subsystem
pub trait VxlanHooks {
    fn init(&mut self);
    fn disable(&mut self);
}

/// Lifecycle of the MLAG subsystem
pub trait MlagHooks {
    fn init(&mut self);
    fn terminate(&mut self);
}

/// Default VXLAN subsystem: only tracks whether it is enabled
#[derive(Debug, Default)]
pub struct Vxlan {
    enabled: bool,
}
impl Vxlan {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
impl VxlanHooks for Vxlan {
    fn init(&mut self) {
        self.enabled = true;
        debug!("VXLAN subsystem initialized");
    }
    fn disable(&mut self) {
        if self.enabled {
            self.enabled = false;
            debug!("VXLAN subsystem disabled");
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MlagRole {
    #[default]
    None,
    Primary,
    Secondary,
}

/// Default MLAG subsystem: tracks whether it runs and its role
#[derive(Debug, Default)]
pub struct Mlag {
    running: bool,
    role: MlagRole,
}
impl Mlag {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
    #[must_use]
    pub fn role(&self) -> MlagRole {
        self.role
    }
    pub fn set_role(&mut self, role: MlagRole) {
        self.role = role;
    }
}
impl MlagHooks for Mlag {
    fn init(&mut self) {
        self.running = true;
        self.role = MlagRole::None;
        debug!("MLAG subsystem initialized");
    }
    fn terminate(&mut self) {
        if self.running {
            self.running = false;
            self.role = MlagRole::None;
            debug!("MLAG subsystem terminated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hooks_track_state() {
        let mut vxlan = Vxlan::default();
        vxlan.init();
        assert!(vxlan.is_enabled());
        vxlan.disable();
        assert!(!vxlan.is_enabled());

        let mut mlag = Mlag::default();
        mlag.init();
        mlag.set_role(MlagRole::Primary);
        assert!(mlag.is_running());
        mlag.terminate();
        assert!(!mlag.is_running());
        assert_eq!(mlag.role(), MlagRole::None);
    }
}
