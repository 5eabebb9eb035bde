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

//! A slab-backed doubly linked list with stable handles.
//!
//! "Top" is the head of the list and "bottom" is its tail. Every structural change bumps a modification counter that
//! [`Cursor`] checks on each step, so a cursor never walks a list that was changed behind its back.

use canopy_common::{
    error::{Error, Result},
    slab::{Slab, Token},
    strict_assert,
};

struct Node<T> {
    val: T,

    prev: Option<Token>,
    next: Option<Token>,
}

/// Doubly linked list addressed by [`Token`] handles.
pub struct EvictionQueueList<T> {
    slab: Slab<Node<T>>,
    head: Option<Token>,
    tail: Option<Token>,
    modifications: u64,
}

impl<T> Default for EvictionQueueList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for EvictionQueueList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter().map(|(_, v)| v)).finish()
    }
}

impl<T> EvictionQueueList<T> {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self {
            slab: Slab::new(),
            head: None,
            tail: None,
            modifications: 0,
        }
    }

    /// Link `val` at the top.
    pub fn add_to_top(&mut self, val: T) -> Token {
        let token = self.alloc(val);
        self.link_between(token, None, self.head);
        token
    }

    /// Link `val` at the bottom.
    pub fn add_to_bottom(&mut self, val: T) -> Token {
        let token = self.alloc(val);
        self.link_between(token, self.tail, None);
        token
    }

    /// Link `val` right before `next`.
    pub fn insert_before(&mut self, next: Token, val: T) -> Result<Token> {
        let prev = self.node(next)?.prev;
        let token = self.alloc(val);
        self.link_between(token, prev, Some(next));
        Ok(token)
    }

    /// Link `val` right after `prev`.
    pub fn insert_after(&mut self, prev: Token, val: T) -> Result<Token> {
        let next = self.node(prev)?.next;
        let token = self.alloc(val);
        self.link_between(token, Some(prev), next);
        Ok(token)
    }

    /// Unlink and return the value bound to `token`. Returns `None` for a stale token.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        if !self.slab.contains(token) {
            return None;
        }
        self.unlink(token);
        self.modifications += 1;
        self.slab.remove(token).map(|node| node.val)
    }

    /// Move the node bound to `token` to the top. Returns `false` for a stale token.
    pub fn move_to_top(&mut self, token: Token) -> bool {
        if !self.slab.contains(token) {
            return false;
        }
        if self.head != Some(token) {
            self.unlink(token);
            self.link_between(token, None, self.head);
            self.modifications += 1;
        }
        true
    }

    /// Move the node bound to `token` to the bottom. Returns `false` for a stale token.
    pub fn move_to_bottom(&mut self, token: Token) -> bool {
        if !self.slab.contains(token) {
            return false;
        }
        if self.tail != Some(token) {
            self.unlink(token);
            self.link_between(token, self.tail, None);
            self.modifications += 1;
        }
        true
    }

    /// Value bound to `token`.
    pub fn get(&self, token: Token) -> Option<&T> {
        self.slab.get(token).map(|node| &node.val)
    }

    /// Mutable value bound to `token`.
    ///
    /// Mutating a value is not a structural modification.
    pub fn get_mut(&mut self, token: Token) -> Option<&mut T> {
        self.slab.get_mut(token).map(|node| &mut node.val)
    }

    /// The top value, or [`Error::NoSuchElement`] if the list is empty.
    pub fn get_first(&self) -> Result<&T> {
        self.head.and_then(|token| self.get(token)).ok_or(Error::NoSuchElement)
    }

    /// The bottom value, or [`Error::NoSuchElement`] if the list is empty.
    pub fn get_last(&self) -> Result<&T> {
        self.tail.and_then(|token| self.get(token)).ok_or(Error::NoSuchElement)
    }

    /// Handle of the top node.
    pub fn first(&self) -> Option<Token> {
        self.head
    }

    /// Handle of the bottom node.
    pub fn last(&self) -> Option<Token> {
        self.tail
    }

    /// Handle of the node after `token`.
    pub fn next(&self, token: Token) -> Option<Token> {
        self.slab.get(token).and_then(|node| node.next)
    }

    /// Handle of the node before `token`.
    pub fn prev(&self, token: Token) -> Option<Token> {
        self.slab.get(token).and_then(|node| node.prev)
    }

    /// Number of linked values.
    pub fn len(&self) -> usize {
        self.slab.len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    /// Number of structural modifications so far.
    pub fn modifications(&self) -> u64 {
        self.modifications
    }

    /// Drop every value. All handles become stale.
    pub fn clear(&mut self) {
        self.slab.clear();
        self.head = None;
        self.tail = None;
        self.modifications += 1;
    }

    /// Top to bottom iterator over handles and values.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            token: self.head,
        }
    }

    /// A fail-fast cursor positioned before the top node.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            next: self.head,
            last: None,
            expected: self.modifications,
        }
    }

    /// Unlink every value, top to bottom.
    pub fn take_vec(&mut self) -> Vec<T> {
        let mut vals = Vec::with_capacity(self.len());
        let mut token = self.head;
        while let Some(t) = token {
            token = self.next(t);
            if let Some(node) = self.slab.remove(t) {
                vals.push(node.val);
            }
        }
        self.clear();
        vals
    }

    /// Replace the whole content with `vals`, top to bottom. Returns the new handles in the same order.
    pub fn from_vec(&mut self, vals: Vec<T>) -> Vec<Token> {
        self.clear();
        vals.into_iter().map(|val| self.add_to_bottom(val)).collect()
    }

    fn alloc(&mut self, val: T) -> Token {
        self.modifications += 1;
        self.slab.insert(Node {
            val,
            prev: None,
            next: None,
        })
    }

    fn node(&self, token: Token) -> Result<&Node<T>> {
        self.slab
            .get(token)
            .ok_or(Error::IllegalState("list handle is not linked"))
    }

    fn unlink(&mut self, token: Token) {
        let (prev, next) = match self.slab.get_mut(token) {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return,
        };
        match prev {
            Some(prev) => {
                if let Some(node) = self.slab.get_mut(prev) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next) => {
                if let Some(node) = self.slab.get_mut(next) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn link_between(&mut self, token: Token, prev: Option<Token>, next: Option<Token>) {
        match prev {
            Some(prev) => {
                if let Some(node) = self.slab.get_mut(prev) {
                    node.next = Some(token);
                }
            }
            None => self.head = Some(token),
        }
        match next {
            Some(next) => {
                if let Some(node) = self.slab.get_mut(next) {
                    node.prev = Some(token);
                }
            }
            None => self.tail = Some(token),
        }
        if let Some(node) = self.slab.get_mut(token) {
            node.prev = prev;
            node.next = next;
        }
    }
}

/// Borrowing top to bottom iterator of an [`EvictionQueueList`].
pub struct Iter<'a, T> {
    list: &'a EvictionQueueList<T>,
    token: Option<Token>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Token, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.token?;
        let node = self.list.slab.get(token)?;
        self.token = node.next;
        Some((token, &node.val))
    }
}

/// A detached, fail-fast, forward-only cursor over an [`EvictionQueueList`].
///
/// The cursor does not borrow the list, so the owner of the list can interleave [`Cursor::next`] with
/// [`Cursor::remove`]. Any structural modification not made through the cursor is reported as
/// [`Error::ConcurrentModification`] on the next step. Once exhausted, the cursor stays exhausted.
#[derive(Debug, Clone)]
pub struct Cursor {
    next: Option<Token>,
    last: Option<Token>,
    expected: u64,
}

impl Cursor {
    /// Step to the next node.
    pub fn next<'a, T>(&mut self, list: &'a EvictionQueueList<T>) -> Result<Option<(Token, &'a T)>> {
        self.check(list)?;
        let Some(token) = self.next.take() else {
            self.last = None;
            return Ok(None);
        };
        let node = list.node(token)?;
        self.next = node.next;
        self.last = Some(token);
        Ok(Some((token, &node.val)))
    }

    /// Remove the node returned by the last [`Cursor::next`].
    pub fn remove<T>(&mut self, list: &mut EvictionQueueList<T>) -> Result<T> {
        self.check(list)?;
        let token = self
            .last
            .take()
            .ok_or(Error::IllegalState("cursor remove() without a preceding next()"))?;
        let val = list
            .remove(token)
            .ok_or(Error::IllegalState("cursor position is not linked"))?;
        self.expected = list.modifications;
        strict_assert!(!list.slab.contains(token));
        Ok(val)
    }

    fn check<T>(&self, list: &EvictionQueueList<T>) -> Result<()> {
        if list.modifications != self.expected {
            return Err(Error::ConcurrentModification {
                expected: self.expected,
                found: list.modifications,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    fn vals<T: Clone>(list: &EvictionQueueList<T>) -> Vec<T> {
        list.iter().map(|(_, v)| v.clone()).collect_vec()
    }

    #[test]
    fn test_add_and_remove() {
        let mut list = EvictionQueueList::new();
        assert!(matches!(list.get_first(), Err(Error::NoSuchElement)));
        assert!(matches!(list.get_last(), Err(Error::NoSuchElement)));

        let b = list.add_to_top(2);
        let a = list.add_to_top(1);
        let c = list.add_to_bottom(3);
        assert_eq!(vals(&list), vec![1, 2, 3]);
        assert_eq!(*list.get_first().unwrap(), 1);
        assert_eq!(*list.get_last().unwrap(), 3);

        assert_eq!(list.remove(b), Some(2));
        assert_eq!(list.remove(b), None);
        assert_eq!(vals(&list), vec![1, 3]);
        assert_eq!(list.next(a), Some(c));
        assert_eq!(list.prev(c), Some(a));

        list.remove(a);
        list.remove(c);
        assert!(list.is_empty());
        assert_eq!(list.first(), None);
        assert_eq!(list.last(), None);
    }

    #[test]
    fn test_move_and_insert() {
        let mut list = EvictionQueueList::new();
        let tokens = (0..4).map(|i| list.add_to_bottom(i)).collect_vec();
        assert!(list.move_to_top(tokens[2]));
        assert_eq!(vals(&list), vec![2, 0, 1, 3]);
        assert!(list.move_to_bottom(tokens[0]));
        assert_eq!(vals(&list), vec![2, 1, 3, 0]);
        list.insert_before(tokens[3], 10).unwrap();
        list.insert_after(tokens[0], 11).unwrap();
        assert_eq!(vals(&list), vec![2, 1, 10, 3, 0, 11]);
        assert_eq!(*list.get_last().unwrap(), 11);

        let stale = tokens[1];
        list.remove(stale);
        assert!(!list.move_to_top(stale));
        assert!(list.insert_before(stale, 99).is_err());
    }

    #[test]
    fn test_cursor_remove() {
        let mut list = EvictionQueueList::new();
        (0..6).for_each(|i| {
            list.add_to_bottom(i);
        });

        let mut cursor = list.cursor();
        assert!(matches!(cursor.remove(&mut list), Err(Error::IllegalState(_))));

        while let Some((_, v)) = cursor.next(&list).unwrap() {
            if v % 2 == 0 {
                cursor.remove(&mut list).unwrap();
            }
        }
        assert_eq!(vals(&list), vec![1, 3, 5]);

        // Not restartable.
        assert!(cursor.next(&list).unwrap().is_none());
    }

    #[test]
    fn test_cursor_fail_fast() {
        let mut list = EvictionQueueList::new();
        let a = list.add_to_bottom("a");
        list.add_to_bottom("b");

        let mut cursor = list.cursor();
        assert_eq!(cursor.next(&list).unwrap().map(|(_, v)| *v), Some("a"));
        list.remove(a);
        assert!(matches!(
            cursor.next(&list),
            Err(Error::ConcurrentModification { .. })
        ));

        let mut cursor = list.cursor();
        list.add_to_top("c");
        assert!(matches!(
            cursor.next(&list),
            Err(Error::ConcurrentModification { .. })
        ));
    }

    #[test]
    fn test_bulk_replace() {
        let mut list = EvictionQueueList::new();
        (0..5).for_each(|i| {
            list.add_to_bottom(i);
        });
        let mut all = list.take_vec();
        assert!(list.is_empty());
        all.reverse();
        let tokens = list.from_vec(all);
        assert_eq!(vals(&list), vec![4, 3, 2, 1, 0]);
        assert_eq!(list.get(tokens[0]), Some(&4));
        assert_eq!(list.len(), 5);
    }
}
