// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded correlation-id table for idempotent submission

use crate::handle::SignalTracker;
use portico_core::CorrelationId;
use std::collections::{HashMap, VecDeque};

/// Remembers which signal each correlation id produced.
///
/// When full, the oldest entry whose signal has finished is forgotten.
/// Entries still pending are never evicted, so the table may briefly
/// exceed its capacity.
pub struct DedupTable {
    capacity: usize,
    entries: HashMap<CorrelationId, SignalTracker>,
    order: VecDeque<CorrelationId>,
}

impl DedupTable {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: HashMap::new(), order: VecDeque::new() }
    }

    pub fn get(&self, id: &CorrelationId) -> Option<&SignalTracker> {
        self.entries.get(id)
    }

    pub fn insert(&mut self, id: CorrelationId, tracker: SignalTracker) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_one();
        }
        if self.entries.insert(id.clone(), tracker).is_none() {
            self.order.push_back(id);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_one(&mut self) {
        let position = self
            .order
            .iter()
            .position(|id| self.entries.get(id).is_some_and(SignalTracker::is_terminal));
        if let Some(id) = position.and_then(|i| self.order.remove(i)) {
            self.entries.remove(&id);
        }
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
