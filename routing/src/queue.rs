// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Deferred-processing queues for RIB updates. The router state only owns them:
//! their processing is driven elsewhere.

use crate::errors::RouterError;
use crate::rib::TableKey;
use ipnet::IpNet;
use std::collections::VecDeque;
use std::fmt::Display;
use tracing::debug;

/// Number of sub-queues of a [`MetaQueue`]. Lower sub-queues are drained first.
pub const META_QUEUE_SIZE: usize = 5;

/// A pending update of a prefix in some table
#[derive(Debug, Clone, PartialEq)]
pub struct RibUpdate {
    pub seq: u64,
    pub table: TableKey,
    pub prefix: IpNet,
}

impl Display for RibUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {} in {}", self.seq, self.prefix, self.table)
    }
}

/// A named FIFO of work items
#[derive(Debug)]
pub struct WorkQueue<T> {
    name: String,
    items: VecDeque<T>,
}

#[allow(clippy::len_without_is_empty)]
impl<T> WorkQueue<T> {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            items: VecDeque::new(),
        }
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn enqueue(&mut self, item: T) {
        self.items.push_back(item);
    }
    /// Process up to `limit` items in order. Returns the number processed.
    pub fn drain<F: FnMut(T)>(&mut self, limit: usize, mut f: F) -> usize {
        let num = limit.min(self.items.len());
        self.items.drain(..num).for_each(&mut f);
        num
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    /// Destroy the queue, discarding pending items
    pub fn free(self) {
        debug!(
            "Freed work queue '{}' ({} pending items discarded)",
            self.name,
            self.items.len()
        );
    }
}

/// A set of FIFOs served by strict priority
#[derive(Debug)]
pub struct MetaQueue<T> {
    subq: [VecDeque<T>; META_QUEUE_SIZE],
}

#[allow(clippy::new_without_default)]
#[allow(clippy::len_without_is_empty)]
impl<T> MetaQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subq: std::array::from_fn(|_| VecDeque::new()),
        }
    }
    pub fn enqueue(&mut self, subq: usize, item: T) -> Result<(), RouterError> {
        let queue = self
            .subq
            .get_mut(subq)
            .ok_or(RouterError::InvalidSubQueue(subq))?;
        queue.push_back(item);
        Ok(())
    }
    /// Pop the next item, highest priority sub-queue first
    pub fn dequeue(&mut self) -> Option<T> {
        self.subq.iter_mut().find_map(VecDeque::pop_front)
    }
    /// Process up to `limit` items in priority order. Returns the number processed.
    pub fn drain<F: FnMut(T)>(&mut self, limit: usize, mut f: F) -> usize {
        let mut num = 0;
        while num < limit {
            let Some(item) = self.dequeue() else {
                break;
            };
            f(item);
            num += 1;
        }
        num
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.subq.iter().map(VecDeque::len).sum()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subq.iter().all(VecDeque::is_empty)
    }
    /// Destroy the queue, discarding pending items
    pub fn free(self) {
        debug!("Freed meta queue ({} pending items discarded)", self.len());
    }
}
