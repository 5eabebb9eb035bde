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
    strict_assert,
};
use hashbrown::HashMap;

use crate::{
    entry::NodeEntry,
    list::{Cursor, EvictionQueueList},
};

/// Ordered collection of [`NodeEntry`] keyed by [`Fqn`], one implementation per policy.
///
/// The order is the policy's eviction order: the first entry is the best eviction candidate.
///
/// Implementations keep `number_of_nodes() == iter().count()` and
/// `number_of_elements() == iter().map(|e| e.number_of_elements()).sum()` between calls.
pub trait EvictionQueue: Send + Sync + 'static {
    /// The best eviction candidate.
    fn get_first_node_entry(&self) -> Option<&NodeEntry>;

    /// The entry of `fqn`.
    fn get_node_entry(&self, fqn: &Fqn) -> Option<&NodeEntry>;

    /// Returns `true` if `fqn` has an entry.
    fn contains_node_entry(&self, fqn: &Fqn) -> bool {
        self.get_node_entry(fqn).is_some()
    }

    /// Insert an entry. Fails with [`Error::DuplicateEntry`] if its path is already present.
    fn add_node_entry(&mut self, entry: NodeEntry) -> Result<()>;

    /// Remove the entry of `fqn`. Removing an absent path is a no-op.
    fn remove_node_entry(&mut self, fqn: &Fqn) -> Option<NodeEntry>;

    /// Record an access to `fqn` at `now` and apply the policy's visit effect. Returns `false` if absent.
    fn visit_node_entry(&mut self, fqn: &Fqn, now: u64) -> bool;

    /// Apply an element delta to `fqn`, clamped at zero. Returns `false` if absent.
    fn modify_element_count(&mut self, fqn: &Fqn, difference: isize, now: u64) -> bool;

    /// Number of entries.
    fn number_of_nodes(&self) -> usize;

    /// Sum of the element counts of all entries.
    fn number_of_elements(&self) -> usize;

    /// Entries in eviction order.
    fn iter(&self) -> Box<dyn Iterator<Item = &NodeEntry> + '_>;

    /// A fail-fast cursor positioned before the first entry.
    fn cursor(&self) -> Cursor;

    /// Step `cursor` to the next entry.
    fn cursor_next<'a>(&'a self, cursor: &mut Cursor) -> Result<Option<&'a NodeEntry>>;

    /// Remove the entry returned by the last [`EvictionQueue::cursor_next`].
    fn cursor_remove(&mut self, cursor: &mut Cursor) -> Result<NodeEntry>;

    /// Restore the eviction order of lazily sorted queues.
    fn resort_eviction_queue(&mut self) {}

    /// Compact storage of lazily removed entries.
    fn prune(&mut self) {}

    /// Remove every entry.
    fn clear(&mut self);
}

/// A queue entry with its list handle and insertion sequence.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) entry: NodeEntry,
    pub(crate) token: Token,
    pub(crate) seq: u64,
}

/// Entries indexed by path and ordered by a list of paths.
///
/// With lazy removal, removed entries leave their list node behind in a removal queue until
/// [`OrderedEntries::prune`] or the next resort. A list node is live only if the slot of its path still points at it.
#[derive(Debug)]
pub(crate) struct OrderedEntries {
    slots: HashMap<Fqn, Slot>,
    order: EvictionQueueList<Fqn>,
    removal_queue: Vec<Token>,
    number_of_elements: usize,
    seq: u64,
    lazy_removal: bool,
}

impl OrderedEntries {
    pub(crate) fn new(lazy_removal: bool) -> Self {
        Self {
            slots: HashMap::new(),
            order: EvictionQueueList::new(),
            removal_queue: vec![],
            number_of_elements: 0,
            seq: 0,
            lazy_removal,
        }
    }

    fn is_live(&self, token: Token, fqn: &Fqn) -> bool {
        self.slots.get(fqn).is_some_and(|slot| slot.token == token)
    }

    pub(crate) fn first(&self) -> Option<&NodeEntry> {
        self.iter().next()
    }

    pub(crate) fn get(&self, fqn: &Fqn) -> Option<&NodeEntry> {
        self.slots.get(fqn).map(|slot| &slot.entry)
    }

    pub(crate) fn slot(&self, fqn: &Fqn) -> Option<&Slot> {
        self.slots.get(fqn)
    }

    pub(crate) fn order(&self) -> &EvictionQueueList<Fqn> {
        &self.order
    }

    /// Insert `entry`, linking its path with `link`.
    pub(crate) fn insert(
        &mut self,
        entry: NodeEntry,
        link: impl FnOnce(&mut EvictionQueueList<Fqn>, Fqn) -> Result<Token>,
    ) -> Result<()> {
        if self.slots.contains_key(entry.fqn()) {
            return Err(Error::DuplicateEntry(entry.fqn().clone()));
        }
        let token = link(&mut self.order, entry.fqn().clone())?;
        self.number_of_elements += entry.number_of_elements();
        self.seq += 1;
        self.slots.insert(
            entry.fqn().clone(),
            Slot {
                entry,
                token,
                seq: self.seq,
            },
        );
        Ok(())
    }

    pub(crate) fn remove(&mut self, fqn: &Fqn) -> Option<NodeEntry> {
        let slot = self.slots.remove(fqn)?;
        self.number_of_elements -= slot.entry.number_of_elements();
        if self.lazy_removal {
            self.removal_queue.push(slot.token);
        } else {
            self.order.remove(slot.token);
        }
        Some(slot.entry)
    }

    /// Record a visit and return the list handle of the entry.
    pub(crate) fn visit(&mut self, fqn: &Fqn, now: u64) -> Option<Token> {
        let slot = self.slots.get_mut(fqn)?;
        slot.entry.visit(now);
        Some(slot.token)
    }

    pub(crate) fn modify_element_count(&mut self, fqn: &Fqn, difference: isize, now: u64) -> bool {
        let Some(slot) = self.slots.get_mut(fqn) else {
            return false;
        };
        let applied = slot.entry.apply_element_difference(difference);
        slot.entry.set_modified_time_stamp(now);
        self.number_of_elements = self.number_of_elements.saturating_add_signed(applied);
        true
    }

    pub(crate) fn set_expiration(&mut self, fqn: &Fqn, expiration: Option<u64>) -> Option<Token> {
        let slot = self.slots.get_mut(fqn)?;
        slot.entry.set_expiration_time_stamp(expiration);
        Some(slot.token)
    }

    /// Relink an entry with `link`, e.g. to move it after a timestamp change.
    pub(crate) fn relink(
        &mut self,
        fqn: &Fqn,
        link: impl FnOnce(&mut EvictionQueueList<Fqn>, Fqn) -> Result<Token>,
    ) -> Result<()> {
        let old = self
            .slots
            .get(fqn)
            .map(|slot| slot.token)
            .ok_or(Error::NoSuchElement)?;
        self.order.remove(old);
        let token = link(&mut self.order, fqn.clone())?;
        if let Some(slot) = self.slots.get_mut(fqn) {
            slot.token = token;
        }
        Ok(())
    }

    pub(crate) fn move_to_top(&mut self, token: Token) -> bool {
        self.order.move_to_top(token)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn number_of_elements(&self) -> usize {
        self.number_of_elements
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &NodeEntry> + '_ {
        self.order
            .iter()
            .filter_map(|(token, fqn)| self.slots.get(fqn).filter(|slot| slot.token == token))
            .map(|slot| &slot.entry)
    }

    pub(crate) fn cursor(&self) -> Cursor {
        self.order.cursor()
    }

    pub(crate) fn cursor_next<'a>(&'a self, cursor: &mut Cursor) -> Result<Option<&'a NodeEntry>> {
        while let Some((token, fqn)) = cursor.next(&self.order)? {
            if let Some(slot) = self.slots.get(fqn).filter(|slot| slot.token == token) {
                return Ok(Some(&slot.entry));
            }
        }
        Ok(None)
    }

    pub(crate) fn cursor_remove(&mut self, cursor: &mut Cursor) -> Result<NodeEntry> {
        let fqn = cursor.remove(&mut self.order)?;
        let slot = self
            .slots
            .remove(&fqn)
            .ok_or(Error::IllegalState("cursor removed an entry that is not live"))?;
        self.number_of_elements -= slot.entry.number_of_elements();
        Ok(slot.entry)
    }

    /// Rebuild the order from the live entries sorted by `key`. Drops the removal queue.
    pub(crate) fn resort_by_key<K: Ord>(&mut self, key: impl Fn(&Slot) -> K) {
        let mut live = self
            .order
            .iter()
            .filter(|(token, fqn)| self.is_live(*token, fqn))
            .map(|(_, fqn)| fqn.clone())
            .collect::<Vec<_>>();
        live.sort_by_cached_key(|fqn| self.slots.get(fqn).map(&key));
        let tokens = self.order.from_vec(live);
        for token in tokens {
            if let Some(fqn) = self.order.get(token) {
                if let Some(slot) = self.slots.get_mut(fqn) {
                    slot.token = token;
                }
            }
        }
        self.removal_queue.clear();
        strict_assert!(self.order.len() == self.slots.len());
    }

    pub(crate) fn prune(&mut self) {
        for token in self.removal_queue.drain(..) {
            self.order.remove(token);
        }
        strict_assert!(self.order.len() == self.slots.len());
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
        self.removal_queue.clear();
        self.number_of_elements = 0;
    }
}

/// Implement the [`EvictionQueue`] methods that only delegate to an `entries: OrderedEntries` field.
macro_rules! delegate_ordered_entries {
    () => {
        fn get_first_node_entry(&self) -> Option<&$crate::entry::NodeEntry> {
            self.entries.first()
        }

        fn get_node_entry(&self, fqn: &canopy_common::fqn::Fqn) -> Option<&$crate::entry::NodeEntry> {
            self.entries.get(fqn)
        }

        fn remove_node_entry(&mut self, fqn: &canopy_common::fqn::Fqn) -> Option<$crate::entry::NodeEntry> {
            self.entries.remove(fqn)
        }

        fn modify_element_count(&mut self, fqn: &canopy_common::fqn::Fqn, difference: isize, now: u64) -> bool {
            self.entries.modify_element_count(fqn, difference, now)
        }

        fn number_of_nodes(&self) -> usize {
            self.entries.len()
        }

        fn number_of_elements(&self) -> usize {
            self.entries.number_of_elements()
        }

        fn iter(&self) -> Box<dyn Iterator<Item = &$crate::entry::NodeEntry> + '_> {
            Box::new(self.entries.iter())
        }

        fn cursor(&self) -> $crate::list::Cursor {
            self.entries.cursor()
        }

        fn cursor_next<'a>(
            &'a self,
            cursor: &mut $crate::list::Cursor,
        ) -> canopy_common::error::Result<Option<&'a $crate::entry::NodeEntry>> {
            self.entries.cursor_next(cursor)
        }

        fn cursor_remove(
            &mut self,
            cursor: &mut $crate::list::Cursor,
        ) -> canopy_common::error::Result<$crate::entry::NodeEntry> {
            self.entries.cursor_remove(cursor)
        }

        fn clear(&mut self) {
            self.entries.clear();
        }
    };
}

pub(crate) use delegate_ordered_entries;

/// Queue ordered by element count, largest first.
pub mod element_size;
/// Queue ordered by expiration time, earliest first.
pub mod expiration;
/// Queue in insertion order.
pub mod fifo;
/// Queue ordered by visit count, least frequently used first.
pub mod lfu;
/// Queue ordered by recency, with a second ordering by age.
pub mod lru;
/// Queue ordered by recency, most recently used first.
pub mod mru;
/// Queue that tracks nothing.
pub mod null;
