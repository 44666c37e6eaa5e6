/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Bounded FIFO of the most recent sampled WC instances (timestamp stripped).

use alloc::collections::VecDeque;

use crate::instance::Instance;

/// Replay window of capacity `Q`. When full, the oldest entry is evicted
/// before a new one is appended.
#[derive(Clone, Debug)]
pub struct ReplayWindow {
    capacity: usize,
    items: VecDeque<Instance>,
}

impl ReplayWindow {
    /// Empty window holding at most `capacity` instances (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), items: VecDeque::new() }
    }

    /// Append `instance`, evicting the oldest entry if the window is full.
    pub fn push(&mut self, instance: Instance) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(instance);
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Instance> + '_ {
        self.items.iter()
    }

    /// Most recent entry.
    pub fn newest(&self) -> Option<&Instance> {
        self.items.back()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Capacity `Q`.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
