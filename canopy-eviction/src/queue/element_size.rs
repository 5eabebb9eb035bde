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

use std::cmp::Reverse;

use canopy_common::{error::Result, fqn::Fqn};

use super::{EvictionQueue, OrderedEntries};
use crate::entry::NodeEntry;

/// Element count ordered queue, largest node first.
///
/// Element events only bump counters. The order is restored by [`EvictionQueue::resort_eviction_queue`], descending by
/// element count with ties kept in insertion order. Removals are buffered until the next resort or
/// [`EvictionQueue::prune`].
#[derive(Debug)]
pub struct ElementSizeQueue {
    entries: OrderedEntries,
}

impl Default for ElementSizeQueue {
    fn default() -> Self {
        Self {
            entries: OrderedEntries::new(true),
        }
    }
}

impl EvictionQueue for ElementSizeQueue {
    delegate_ordered_entries!();

    fn add_node_entry(&mut self, entry: NodeEntry) -> Result<()> {
        self.entries.insert(entry, |order, fqn| Ok(order.add_to_bottom(fqn)))
    }

    fn visit_node_entry(&mut self, fqn: &Fqn, now: u64) -> bool {
        self.entries.visit(fqn, now).is_some()
    }

    fn resort_eviction_queue(&mut self) {
        self.entries
            .resort_by_key(|slot| (Reverse(slot.entry.number_of_elements()), slot.seq));
    }

    fn prune(&mut self) {
        self.entries.prune();
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_element_size_order() {
        let mut queue = ElementSizeQueue::default();
        for i in 0..6 {
            let mut entry = NodeEntry::new(Fqn::parse(&format!("/{i}")));
            entry.set_number_of_elements(i % 3);
            queue.add_node_entry(entry).unwrap();
        }
        assert_eq!(queue.number_of_elements(), 6);

        queue.resort_eviction_queue();
        let order = queue.iter().map(|e| e.fqn().to_string()).collect_vec();
        assert_eq!(order, vec!["/2", "/5", "/1", "/4", "/0", "/3"]);

        queue.modify_element_count(&Fqn::parse("/3"), 5, 0);
        queue.remove_node_entry(&Fqn::parse("/2"));
        queue.resort_eviction_queue();
        let order = queue.iter().map(|e| e.fqn().to_string()).collect_vec();
        assert_eq!(order, vec!["/3", "/5", "/1", "/4", "/0"]);
        assert_eq!(queue.number_of_elements(), 9);
    }
}
