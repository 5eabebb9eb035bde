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

use std::fmt::Display;

use canopy_common::{
    fqn::Fqn,
    object_pool::{ObjectPool, ObjectPoolStats},
};
use serde::{Deserialize, Serialize};

/// Kind of access reported by the owning cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A node was created.
    AddNode,
    /// A node was removed by the owning cache.
    RemoveNode,
    /// A node was read.
    VisitNode,
    /// Elements were added to a node.
    AddElement,
    /// Elements were removed from a node.
    RemoveElement,
}

impl EventType {
    /// Element delta carried by an event of this kind when none is given.
    pub fn default_element_difference(&self) -> usize {
        match self {
            EventType::AddElement | EventType::RemoveElement => 1,
            EventType::AddNode | EventType::RemoveNode | EventType::VisitNode => 0,
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::AddNode => "ADD_NODE",
            EventType::RemoveNode => "REMOVE_NODE",
            EventType::VisitNode => "VISIT_NODE",
            EventType::AddElement => "ADD_ELEMENT",
            EventType::RemoveElement => "REMOVE_ELEMENT",
        };
        write!(f, "{s}")
    }
}

/// An access record queued on a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionEvent {
    fqn: Fqn,
    kind: EventType,
    element_difference: usize,
}

impl Default for EvictionEvent {
    fn default() -> Self {
        Self {
            fqn: Fqn::root(),
            kind: EventType::AddNode,
            element_difference: 0,
        }
    }
}

impl EvictionEvent {
    /// Create an event with the default element delta of `kind`.
    pub fn new(fqn: Fqn, kind: EventType) -> Self {
        let element_difference = kind.default_element_difference();
        Self {
            fqn,
            kind,
            element_difference,
        }
    }

    /// Path of the node.
    pub fn fqn(&self) -> &Fqn {
        &self.fqn
    }

    /// Kind of access.
    pub fn kind(&self) -> EventType {
        self.kind
    }

    /// Number of elements added or removed.
    pub fn element_difference(&self) -> usize {
        self.element_difference
    }

    /// Signed element delta to apply to the node.
    pub fn signed_element_difference(&self) -> isize {
        let difference = self.element_difference.min(isize::MAX as usize) as isize;
        match self.kind {
            EventType::RemoveElement => -difference,
            _ => difference,
        }
    }

    pub(crate) fn reset(&mut self, fqn: Fqn, kind: EventType, element_difference: usize) {
        self.fqn = fqn;
        self.kind = kind;
        self.element_difference = element_difference;
    }

    pub(crate) fn clear(&mut self) {
        self.reset(Fqn::root(), EventType::AddNode, 0);
    }
}

/// Bounded recycle pool of boxed [`EvictionEvent`]s.
///
/// Acquiring from an exhausted pool allocates a fresh event and never waits.
#[derive(Debug, Clone)]
pub struct EventPool {
    pool: ObjectPool<Box<EvictionEvent>>,
}

impl EventPool {
    /// Create a pool that keeps up to `capacity` events for reuse.
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: ObjectPool::new(capacity),
        }
    }

    /// Take an event from the pool and fill it.
    pub fn acquire(&self, fqn: Fqn, kind: EventType, element_difference: usize) -> Box<EvictionEvent> {
        let mut event = self.pool.acquire();
        event.reset(fqn, kind, element_difference);
        event
    }

    /// Give a consumed event back to the pool.
    pub fn release(&self, mut event: Box<EvictionEvent>) {
        event.clear();
        self.pool.release(event);
    }

    /// Number of pooled events.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns `true` if no event is pooled.
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Reuse counters.
    pub fn stats(&self) -> ObjectPoolStats {
        self.pool.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_defaults() {
        let event = EvictionEvent::new(Fqn::parse("/a"), EventType::RemoveElement);
        assert_eq!(event.element_difference(), 1);
        assert_eq!(event.signed_element_difference(), -1);
        assert_eq!(EvictionEvent::new(Fqn::parse("/a"), EventType::VisitNode).element_difference(), 0);
        assert_eq!(EventType::AddElement.to_string(), "ADD_ELEMENT");
    }

    #[test]
    fn test_event_pool_reuse() {
        let pool = EventPool::new(2);
        let a = pool.acquire(Fqn::parse("/a"), EventType::AddNode, 3);
        let b = pool.acquire(Fqn::parse("/b"), EventType::VisitNode, 0);
        let c = pool.acquire(Fqn::parse("/c"), EventType::VisitNode, 0);
        assert_eq!(pool.stats().misses, 3);

        pool.release(a);
        pool.release(b);
        pool.release(c);
        assert_eq!(pool.len(), 2);

        let d = pool.acquire(Fqn::parse("/d"), EventType::RemoveNode, 0);
        assert_eq!(d.fqn(), &Fqn::parse("/d"));
        assert_eq!(d.kind(), EventType::RemoveNode);
        assert_eq!(pool.stats().hits, 1);
    }
}
