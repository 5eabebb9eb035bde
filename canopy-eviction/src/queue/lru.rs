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

use canopy_common::{
    error::{Error, Result},
    fqn::Fqn,
    slab::Token,
};
use hashbrown::HashMap;

use super::EvictionQueue;
use crate::{
    entry::NodeEntry,
    list::{Cursor, EvictionQueueList},
};

/// The two orderings kept by [`LruQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LruOrder {
    /// Least recently visited first.
    Recency,
    /// Earliest created first.
    Age,
}

#[derive(Debug)]
struct LruSlot {
    entry: NodeEntry,
    recency: Token,
    age: Token,
}

/// Least recently used queue.
///
/// Keeps a recency list, reordered on every visit or element change, and an age list in creation order that visits never touch.
/// [`EvictionQueue`] methods walk the recency list.
#[derive(Debug, Default)]
pub struct LruQueue {
    slots: HashMap<Fqn, LruSlot>,
    recency: EvictionQueueList<Fqn>,
    age: EvictionQueueList<Fqn>,
    number_of_elements: usize,
}

impl LruQueue {
    fn list(&self, order: LruOrder) -> &EvictionQueueList<Fqn> {
        match order {
            LruOrder::Recency => &self.recency,
            LruOrder::Age => &self.age,
        }
    }

    /// Entries in `order`.
    pub fn iter_by(&self, order: LruOrder) -> impl Iterator<Item = &NodeEntry> + '_ {
        self.list(order)
            .iter()
            .filter_map(|(_, fqn)| self.slots.get(fqn).map(|slot| &slot.entry))
    }

    /// A fail-fast cursor over `order`.
    pub fn cursor_by(&self, order: LruOrder) -> Cursor {
        self.list(order).cursor()
    }

    /// Step a cursor created by [`LruQueue::cursor_by`] with the same `order`.
    pub fn cursor_next_by<'a>(&'a self, order: LruOrder, cursor: &mut Cursor) -> Result<Option<&'a NodeEntry>> {
        match cursor.next(self.list(order))? {
            Some((_, fqn)) => self
                .slots
                .get(fqn)
                .map(|slot| Some(&slot.entry))
                .ok_or(Error::IllegalState("lru list holds a path without entry")),
            None => Ok(None),
        }
    }

    /// Remove the entry returned by the last [`LruQueue::cursor_next_by`] from both orderings.
    pub fn cursor_remove_by(&mut self, order: LruOrder, cursor: &mut Cursor) -> Result<NodeEntry> {
        let fqn = match order {
            LruOrder::Recency => cursor.remove(&mut self.recency)?,
            LruOrder::Age => cursor.remove(&mut self.age)?,
        };
        let slot = self
            .slots
            .remove(&fqn)
            .ok_or(Error::IllegalState("lru list holds a path without entry"))?;
        match order {
            LruOrder::Recency => self.age.remove(slot.age),
            LruOrder::Age => self.recency.remove(slot.recency),
        };
        self.number_of_elements -= slot.entry.number_of_elements();
        Ok(slot.entry)
    }
}

impl EvictionQueue for LruQueue {
    fn get_first_node_entry(&self) -> Option<&NodeEntry> {
        self.iter_by(LruOrder::Recency).next()
    }

    fn get_node_entry(&self, fqn: &Fqn) -> Option<&NodeEntry> {
        self.slots.get(fqn).map(|slot| &slot.entry)
    }

    fn add_node_entry(&mut self, entry: NodeEntry) -> Result<()> {
        if self.slots.contains_key(entry.fqn()) {
            return Err(Error::DuplicateEntry(entry.fqn().clone()));
        }
        let fqn = entry.fqn().clone();
        let recency = self.recency.add_to_bottom(fqn.clone());
        let age = self.age.add_to_bottom(fqn.clone());
        self.number_of_elements += entry.number_of_elements();
        self.slots.insert(fqn, LruSlot { entry, recency, age });
        Ok(())
    }

    fn remove_node_entry(&mut self, fqn: &Fqn) -> Option<NodeEntry> {
        let slot = self.slots.remove(fqn)?;
        self.recency.remove(slot.recency);
        self.age.remove(slot.age);
        self.number_of_elements -= slot.entry.number_of_elements();
        Some(slot.entry)
    }

    fn visit_node_entry(&mut self, fqn: &Fqn, now: u64) -> bool {
        let Some(slot) = self.slots.get_mut(fqn) else {
            return false;
        };
        slot.entry.visit(now);
        self.recency.move_to_bottom(slot.recency)
    }

    fn modify_element_count(&mut self, fqn: &Fqn, difference: isize, now: u64) -> bool {
        let Some(slot) = self.slots.get_mut(fqn) else {
            return false;
        };
        let applied = slot.entry.apply_element_difference(difference);
        slot.entry.set_modified_time_stamp(now);
        self.number_of_elements = self.number_of_elements.saturating_add_signed(applied);
        // The recency list stays sorted by modified timestamp.
        self.recency.move_to_bottom(slot.recency)
    }

    fn number_of_nodes(&self) -> usize {
        self.slots.len()
    }

    fn number_of_elements(&self) -> usize {
        self.number_of_elements
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &NodeEntry> + '_> {
        Box::new(self.iter_by(LruOrder::Recency))
    }

    fn cursor(&self) -> Cursor {
        self.cursor_by(LruOrder::Recency)
    }

    fn cursor_next<'a>(&'a self, cursor: &mut Cursor) -> Result<Option<&'a NodeEntry>> {
        self.cursor_next_by(LruOrder::Recency, cursor)
    }

    fn cursor_remove(&mut self, cursor: &mut Cursor) -> Result<NodeEntry> {
        self.cursor_remove_by(LruOrder::Recency, cursor)
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.recency.clear();
        self.age.clear();
        self.number_of_elements = 0;
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    fn names<'a>(entries: impl Iterator<Item = &'a NodeEntry>) -> Vec<String> {
        entries.map(|e| e.fqn().to_string()).collect_vec()
    }

    #[test]
    fn test_lru_orderings() {
        let mut queue = LruQueue::default();
        for i in 0..5 {
            queue
                .add_node_entry(NodeEntry::with_timestamp(Fqn::parse(&format!("/{i}")), i))
                .unwrap();
        }
        queue.visit_node_entry(&Fqn::parse("/1"), 10);
        queue.visit_node_entry(&Fqn::parse("/0"), 11);

        assert_eq!(names(queue.iter()), vec!["/2", "/3", "/4", "/1", "/0"]);
        assert_eq!(names(queue.iter_by(LruOrder::Age)), vec!["/0", "/1", "/2", "/3", "/4"]);

        queue.remove_node_entry(&Fqn::parse("/3"));
        assert_eq!(names(queue.iter()), vec!["/2", "/4", "/1", "/0"]);
        assert_eq!(names(queue.iter_by(LruOrder::Age)), vec!["/0", "/1", "/2", "/4"]);
    }

    #[test]
    fn test_lru_cursor_by_age() {
        let mut queue = LruQueue::default();
        for i in 0..4 {
            queue.add_node_entry(NodeEntry::new(Fqn::parse(&format!("/{i}")))).unwrap();
        }
        queue.visit_node_entry(&Fqn::parse("/0"), 1);

        let mut cursor = queue.cursor_by(LruOrder::Age);
        let first = queue.cursor_next_by(LruOrder::Age, &mut cursor).unwrap().unwrap();
        assert_eq!(first.fqn(), &Fqn::parse("/0"));
        queue.cursor_remove_by(LruOrder::Age, &mut cursor).unwrap();

        assert_eq!(names(queue.iter()), vec!["/1", "/2", "/3"]);
        assert_eq!(queue.number_of_nodes(), 3);
    }
}
