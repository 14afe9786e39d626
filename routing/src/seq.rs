// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Sequence numbers to order route-change events

use std::sync::atomic::{AtomicU64, Ordering};

/// Generator of strictly increasing sequence numbers. It may be shared among
/// threads; uniqueness only relies on the atomicity of the increment.
#[derive(Debug, Default)]
pub struct SequenceGenerator(AtomicU64);

impl SequenceGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Get the next sequence number. The first one is 1.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Last sequence number handed out, 0 if none
    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}
