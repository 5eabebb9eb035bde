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

//! A slab arena with generational tokens.
//!
//! A [`Token`] stays bound to the value it was issued for. Once the value is removed, the slot's generation is bumped
//! and the stale token no longer resolves, even after the slot is reused.

/// Handle of a value stored in a [`Slab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    index: usize,
    generation: u32,
}

impl Token {
    /// Slot index of the token.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Generation of the slot when the token was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
enum Entry<T> {
    Vacant { next: usize, generation: u32 },
    Occupied { val: T, generation: u32 },
}

/// Pre-allocated storage for values of a single type, addressed by [`Token`].
#[derive(Debug, Clone)]
pub struct Slab<T> {
    entries: Vec<Entry<T>>,
    len: usize,
    next: usize,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slab<T> {
    /// Create an empty slab.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            len: 0,
            next: 0,
        }
    }

    /// Create an empty slab with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            len: 0,
            next: 0,
        }
    }

    /// Insert a value and return its token.
    pub fn insert(&mut self, val: T) -> Token {
        let index = self.next;
        self.len += 1;

        if index == self.entries.len() {
            self.entries.push(Entry::Occupied { val, generation: 0 });
            self.next = index + 1;
            return Token { index, generation: 0 };
        }

        let (next, generation) = match self.entries[index] {
            Entry::Vacant { next, generation } => (next, generation),
            Entry::Occupied { .. } => unreachable!("slab free list points at an occupied slot"),
        };
        self.next = next;
        self.entries[index] = Entry::Occupied { val, generation };
        Token { index, generation }
    }

    /// Remove the value bound to `token`. Returns `None` for a stale token.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        let entry = self.entries.get_mut(token.index)?;
        match entry {
            Entry::Occupied { generation, .. } if *generation == token.generation => {}
            _ => return None,
        }
        let vacant = Entry::Vacant {
            next: self.next,
            generation: token.generation.wrapping_add(1),
        };
        match std::mem::replace(entry, vacant) {
            Entry::Occupied { val, .. } => {
                self.len -= 1;
                self.next = token.index;
                Some(val)
            }
            Entry::Vacant { .. } => unreachable!(),
        }
    }

    /// Get the value bound to `token`.
    pub fn get(&self, token: Token) -> Option<&T> {
        match self.entries.get(token.index) {
            Some(Entry::Occupied { val, generation }) if *generation == token.generation => Some(val),
            _ => None,
        }
    }

    /// Get the mutable value bound to `token`.
    pub fn get_mut(&mut self, token: Token) -> Option<&mut T> {
        match self.entries.get_mut(token.index) {
            Some(Entry::Occupied { val, generation }) if *generation == token.generation => Some(val),
            _ => None,
        }
    }

    /// Returns `true` if `token` still resolves to a value.
    pub fn contains(&self, token: Token) -> bool {
        self.get(token).is_some()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the slab holds no value.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove all values. Every outstanding token becomes stale.
    pub fn clear(&mut self) {
        let mut next = self.entries.len();
        for (index, entry) in self.entries.iter_mut().enumerate().rev() {
            let generation = match entry {
                Entry::Occupied { generation, .. } => generation.wrapping_add(1),
                Entry::Vacant { generation, .. } => *generation,
            };
            *entry = Entry::Vacant { next, generation };
            next = index;
        }
        self.next = next;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slab_reuse() {
        let mut slab = Slab::new();
        let a = slab.insert("a");
        let b = slab.insert("b");
        assert_eq!(slab.len(), 2);

        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.remove(a), None);

        let c = slab.insert("c");
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert_eq!(slab.get(a), None);
        assert_eq!(slab.get(c), Some(&"c"));
        assert_eq!(slab.get(b), Some(&"b"));
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn test_slab_clear() {
        let mut slab = Slab::with_capacity(4);
        let tokens = (0..4).map(|i| slab.insert(i)).collect::<Vec<_>>();
        slab.remove(tokens[1]);
        slab.clear();
        assert!(slab.is_empty());
        assert!(tokens.iter().all(|t| !slab.contains(*t)));

        let t = slab.insert(42);
        assert_eq!(t.index(), 0);
        assert_eq!(slab.get(t), Some(&42));
        for i in 0..4 {
            slab.insert(i);
        }
        assert_eq!(slab.len(), 5);
    }
}
