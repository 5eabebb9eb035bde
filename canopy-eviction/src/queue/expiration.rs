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

use canopy_common::{error::Result, fqn::Fqn, slab::Token};

use super::{EvictionQueue, OrderedEntries};
use crate::entry::NodeEntry;

/// Expiration ordered queue, earliest expiration first.
///
/// Entries without an expiration sort last. Entries with the same expiration keep insertion order.
#[derive(Debug)]
pub struct ExpirationQueue {
    entries: OrderedEntries,
}

impl Default for ExpirationQueue {
    fn default() -> Self {
        Self {
            entries: OrderedEntries::new(false),
        }
    }
}

impl ExpirationQueue {
    /// Change the expiration of `fqn` and move it to its new position. Returns `false` if absent.
    pub fn reschedule(&mut self, fqn: &Fqn, expiration: Option<u64>) -> Result<bool> {
        if self.entries.set_expiration(fqn, expiration).is_none() {
            return Ok(false);
        }
        let after = self.position(expiration, Some(fqn));
        self.entries.relink(fqn, |order, fqn| match after {
            Some(prev) => order.insert_after(prev, fqn),
            None => Ok(order.add_to_top(fqn)),
        })?;
        Ok(true)
    }

    /// The last node expiring no later than `expiration`, walking from the bottom.
    fn position(&self, expiration: Option<u64>, skip: Option<&Fqn>) -> Option<Token> {
        let key = expiration.unwrap_or(u64::MAX);
        let order = self.entries.order();
        let mut cursor = order.last();
        while let Some(token) = cursor {
            cursor = order.prev(token);
            let Some(fqn) = order.get(token) else {
                continue;
            };
            if Some(fqn) == skip {
                continue;
            }
            let Some(slot) = self.entries.slot(fqn) else {
                continue;
            };
            if slot.entry.expiration_time_stamp().unwrap_or(u64::MAX) <= key {
                return Some(token);
            }
        }
        None
    }
}

impl EvictionQueue for ExpirationQueue {
    delegate_ordered_entries!();

    fn add_node_entry(&mut self, entry: NodeEntry) -> Result<()> {
        let after = self.position(entry.expiration_time_stamp(), None);
        self.entries.insert(entry, |order, fqn| match after {
            Some(prev) => order.insert_after(prev, fqn),
            None => Ok(order.add_to_top(fqn)),
        })
    }

    fn visit_node_entry(&mut self, fqn: &Fqn, now: u64) -> bool {
        self.entries.visit(fqn, now).is_some()
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    fn entry(name: &str, expiration: Option<u64>) -> NodeEntry {
        let mut entry = NodeEntry::new(Fqn::parse(name));
        entry.set_expiration_time_stamp(expiration);
        entry
    }

    fn order(queue: &ExpirationQueue) -> Vec<String> {
        queue.iter().map(|e| e.fqn().to_string()).collect_vec()
    }

    #[test]
    fn test_expiration_order() {
        let mut queue = ExpirationQueue::default();
        queue.add_node_entry(entry("/a", Some(300))).unwrap();
        queue.add_node_entry(entry("/b", None)).unwrap();
        queue.add_node_entry(entry("/c", Some(100))).unwrap();
        queue.add_node_entry(entry("/d", Some(300))).unwrap();
        queue.add_node_entry(entry("/e", Some(200))).unwrap();
        assert_eq!(order(&queue), vec!["/c", "/e", "/a", "/d", "/b"]);

        assert!(queue.reschedule(&Fqn::parse("/c"), Some(250)).unwrap());
        assert_eq!(order(&queue), vec!["/e", "/c", "/a", "/d", "/b"]);

        assert!(queue.reschedule(&Fqn::parse("/b"), Some(50)).unwrap());
        assert_eq!(order(&queue), vec!["/b", "/e", "/c", "/a", "/d"]);
        assert_eq!(queue.get_first_node_entry().unwrap().expiration_time_stamp(), Some(50));

        assert!(!queue.reschedule(&Fqn::parse("/x"), Some(1)).unwrap());
        assert_eq!(queue.number_of_nodes(), 5);
    }
}
