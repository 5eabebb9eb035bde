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

/// Visit count ordered queue, least frequently used first.
///
/// Visits only bump counters. The order is restored by [`EvictionQueue::resort_eviction_queue`], ascending by visit
/// count, then by modified timestamp, then by insertion. Removals are buffered until the next resort or
/// [`EvictionQueue::prune`].
#[derive(Debug)]
pub struct LfuQueue {
    entries: OrderedEntries,
}

impl Default for LfuQueue {
    fn default() -> Self {
        Self {
            entries: OrderedEntries::new(true),
        }
    }
}

impl EvictionQueue for LfuQueue {
    delegate_ordered_entries!();

    fn add_node_entry(&mut self, entry: NodeEntry) -> Result<()> {
        self.entries.insert(entry, |order, fqn| Ok(order.add_to_top(fqn)))
    }

    fn visit_node_entry(&mut self, fqn: &Fqn, now: u64) -> bool {
        self.entries.visit(fqn, now).is_some()
    }

    fn resort_eviction_queue(&mut self) {
        self.entries.resort_by_key(|slot| {
            (
                slot.entry.number_of_node_visits(),
                slot.entry.modified_time_stamp(),
                slot.seq,
            )
        });
    }

    fn prune(&mut self) {
        self.entries.prune();
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    fn fqn(i: usize) -> Fqn {
        Fqn::parse(&format!("/a/{i}"))
    }

    #[test]
    fn test_lfu_resort_order() {
        let mut queue = LfuQueue::default();
        for i in 0..500 {
            queue.add_node_entry(NodeEntry::new(fqn(i))).unwrap();
        }
        for i in (0..500).step_by(2) {
            queue.visit_node_entry(&fqn(i), 0);
        }
        queue.resort_eviction_queue();

        let visits = queue.iter().map(|e| e.number_of_node_visits()).collect_vec();
        assert!(visits.iter().tuple_windows().all(|(a, b)| a <= b));
        let entries = queue.iter().collect_vec();
        let (odd, even) = entries.split_at(250);
        assert!(odd.iter().all(|e| e.number_of_node_visits() == 0));
        assert!(odd
            .iter()
            .all(|e| e.fqn().name().unwrap().parse::<usize>().unwrap() % 2 == 1));
        assert!(even.iter().all(|e| e.number_of_node_visits() == 1));
    }

    #[test]
    fn test_lfu_ties_by_modified_time() {
        let mut queue = LfuQueue::default();
        for (i, modified) in [(0, 30), (1, 10), (2, 20)] {
            queue
                .add_node_entry(NodeEntry::with_timestamp(fqn(i), modified))
                .unwrap();
        }
        queue.resort_eviction_queue();
        let order = queue.iter().map(|e| e.fqn().clone()).collect_vec();
        assert_eq!(order, vec![fqn(1), fqn(2), fqn(0)]);
    }

    #[test]
    fn test_lfu_lazy_removal() {
        let mut queue = LfuQueue::default();
        for i in 0..4 {
            queue.add_node_entry(NodeEntry::new(fqn(i))).unwrap();
        }
        queue.remove_node_entry(&fqn(1));
        assert_eq!(queue.number_of_nodes(), 3);
        assert_eq!(queue.iter().count(), 3);

        queue.add_node_entry(NodeEntry::new(fqn(1))).unwrap();
        assert_eq!(queue.iter().filter(|e| e.fqn() == &fqn(1)).count(), 1);

        queue.prune();
        assert_eq!(queue.iter().count(), 4);
        assert_eq!(queue.number_of_nodes(), 4);
    }
}
