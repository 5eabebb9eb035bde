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

/// Stack ordered queue: the most recently added or visited entry is on top and is evicted first.
#[derive(Debug)]
pub struct MruQueue {
    entries: OrderedEntries,
}

impl Default for MruQueue {
    fn default() -> Self {
        Self {
            entries: OrderedEntries::new(false),
        }
    }
}

impl EvictionQueue for MruQueue {
    delegate_ordered_entries!();

    fn add_node_entry(&mut self, entry: NodeEntry) -> Result<()> {
        self.entries.insert(entry, |order, fqn| Ok(order.add_to_top(fqn)))
    }

    fn visit_node_entry(&mut self, fqn: &Fqn, now: u64) -> bool {
        match self.entries.visit(fqn, now) {
            Some(token) => self.entries.move_to_top(token),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_mru_queue() {
        let mut queue = MruQueue::default();
        for i in 0..4 {
            queue.add_node_entry(NodeEntry::new(Fqn::parse(&format!("/{i}")))).unwrap();
        }
        let order = |q: &MruQueue| q.iter().map(|e| e.fqn().to_string()).collect_vec();
        assert_eq!(order(&queue), vec!["/3", "/2", "/1", "/0"]);

        queue.visit_node_entry(&Fqn::parse("/1"), 1);
        assert_eq!(order(&queue), vec!["/1", "/3", "/2", "/0"]);
        assert_eq!(queue.get_first_node_entry().unwrap().number_of_node_visits(), 1);

        queue.remove_node_entry(&Fqn::parse("/1"));
        assert_eq!(order(&queue), vec!["/3", "/2", "/0"]);
    }
}
