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

use std::hash::{Hash, Hasher};

use canopy_common::fqn::Fqn;

/// Per-node eviction bookkeeping.
///
/// Identity is the [`Fqn`] only: equality and hashing ignore the mutable counters and timestamps.
#[derive(Debug, Clone)]
pub struct NodeEntry {
    fqn: Fqn,
    number_of_elements: usize,
    number_of_node_visits: usize,
    creation_time_stamp: u64,
    modified_time_stamp: u64,
    expiration_time_stamp: Option<u64>,
}

impl NodeEntry {
    /// Create an entry with zeroed counters and timestamps.
    pub fn new(fqn: Fqn) -> Self {
        Self::with_timestamp(fqn, 0)
    }

    /// Create an entry created and last modified at `now`.
    pub fn with_timestamp(fqn: Fqn, now: u64) -> Self {
        Self {
            fqn,
            number_of_elements: 0,
            number_of_node_visits: 0,
            creation_time_stamp: now,
            modified_time_stamp: now,
            expiration_time_stamp: None,
        }
    }

    /// Path of the node.
    pub fn fqn(&self) -> &Fqn {
        &self.fqn
    }

    /// Number of data elements held by the node.
    pub fn number_of_elements(&self) -> usize {
        self.number_of_elements
    }

    /// Number of recorded accesses.
    pub fn number_of_node_visits(&self) -> usize {
        self.number_of_node_visits
    }

    /// Creation time in millis.
    pub fn creation_time_stamp(&self) -> u64 {
        self.creation_time_stamp
    }

    /// Last access or modification time in millis.
    pub fn modified_time_stamp(&self) -> u64 {
        self.modified_time_stamp
    }

    /// Absolute expiration time in millis, if the node carries one.
    pub fn expiration_time_stamp(&self) -> Option<u64> {
        self.expiration_time_stamp
    }

    /// Set the element count.
    pub fn set_number_of_elements(&mut self, number_of_elements: usize) {
        self.number_of_elements = number_of_elements;
    }

    /// Set the visit count.
    pub fn set_number_of_node_visits(&mut self, number_of_node_visits: usize) {
        self.number_of_node_visits = number_of_node_visits;
    }

    /// Set the creation time.
    pub fn set_creation_time_stamp(&mut self, millis: u64) {
        self.creation_time_stamp = millis;
    }

    /// Set the last modification time.
    pub fn set_modified_time_stamp(&mut self, millis: u64) {
        self.modified_time_stamp = millis;
    }

    /// Set the absolute expiration time.
    pub fn set_expiration_time_stamp(&mut self, millis: Option<u64>) {
        self.expiration_time_stamp = millis;
    }

    /// Record an access at `now`.
    pub fn visit(&mut self, now: u64) {
        self.number_of_node_visits = self.number_of_node_visits.saturating_add(1);
        self.modified_time_stamp = self.modified_time_stamp.max(now);
    }

    /// Apply an element count delta, clamped at zero. Returns the applied delta.
    pub fn apply_element_difference(&mut self, difference: isize) -> isize {
        let before = self.number_of_elements;
        self.number_of_elements = before.saturating_add_signed(difference);
        self.number_of_elements as isize - before as isize
    }
}

impl PartialEq for NodeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fqn == other.fqn
    }
}

impl Eq for NodeEntry {}

impl Hash for NodeEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fqn.hash(state);
    }
}
