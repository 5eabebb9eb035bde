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

use canopy_common::{error::Result, fqn::Fqn};

use super::{EvictionQueue, OrderedEntries};
use crate::entry::NodeEntry;

/// Insertion ordered queue. Visits never reorder it.
#[derive(Debug)]
pub struct FifoQueue {
    entries: OrderedEntries,
}

impl Default for FifoQueue {
    fn default() -> Self {
        Self {
            entries: OrderedEntries::new(false),
        }
    }
}

impl EvictionQueue for FifoQueue {
    delegate_ordered_entries!();

    fn add_node_entry(&mut self, entry: NodeEntry) -> Result<()> {
        self.entries.insert(entry, |order, fqn| Ok(order.add_to_bottom(fqn)))
    }

    fn visit_node_entry(&mut self, fqn: &Fqn, now: u64) -> bool {
        self.entries.visit(fqn, now).is_some()
    }
}
