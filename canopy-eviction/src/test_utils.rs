// Copyright 2025 canopy Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Utilities for testing.

use std::sync::Arc;

use canopy_common::fqn::Fqn;
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use parking_lot::{Mutex, MutexGuard};

use crate::{action::EvictionAction, queue::EvictionQueue};

#[derive(Debug, Default)]
struct RecordingActionInner {
    evicted: Mutex<Vec<Fqn>>,
    refused: Mutex<HashSet<Fqn>>,
    expirations: Mutex<HashMap<Fqn, u64>>,
}

/// An eviction callback that records evicted paths.
///
/// Paths can be set to refuse eviction, and expirations can be preset.
#[derive(Debug, Clone, Default)]
pub struct RecordingAction {
    inner: Arc<RecordingActionInner>,
}

impl RecordingAction {
    /// Get all evicted paths, in eviction order.
    pub fn evicted(&self) -> MutexGuard<'_, Vec<Fqn>> {
        self.inner.evicted.lock()
    }

    /// Evicted paths as strings, in eviction order.
    pub fn evicted_names(&self) -> Vec<String> {
        self.inner.evicted.lock().iter().map(|fqn| fqn.to_string()).collect_vec()
    }

    /// Make evictions of `fqn` fail until [`RecordingAction::accept`].
    pub fn refuse(&self, fqn: &Fqn) {
        self.inner.refused.lock().insert(fqn.clone());
    }

    /// Let evictions of `fqn` succeed again.
    pub fn accept(&self, fqn: &Fqn) {
        self.inner.refused.lock().remove(fqn);
    }

    /// Report `expiration` for `fqn` regardless of the key.
    pub fn set_expiration(&self, fqn: &Fqn, expiration: u64) {
        self.inner.expirations.lock().insert(fqn.clone(), expiration);
    }
}

impl EvictionAction for RecordingAction {
    fn evict(&self, fqn: &Fqn) -> bool {
        if self.inner.refused.lock().contains(fqn) {
            return false;
        }
        self.inner.evicted.lock().push(fqn.clone());
        true
    }

    fn expiration(&self, fqn: &Fqn, _: &str) -> Option<u64> {
        self.inner.expirations.lock().get(fqn).copied()
    }
}

/// Assert the aggregate counters of `queue` match its entries.
pub fn assert_queue_counters(queue: &dyn EvictionQueue) {
    let entries = queue.iter().collect_vec();
    assert_eq!(queue.number_of_nodes(), entries.len());
    assert_eq!(
        queue.number_of_elements(),
        entries.iter().map(|e| e.number_of_elements()).sum::<usize>()
    );
    assert_eq!(entries.iter().map(|e| e.fqn()).unique().count(), entries.len());
}
