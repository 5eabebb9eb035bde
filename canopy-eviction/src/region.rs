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

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use canopy_common::{clock::Clock, error::Result, fqn::Fqn, object_pool::ObjectPoolStats};
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

use crate::{
    action::EvictionAction,
    algorithm::{EvictionAlgorithm, EvictionAlgorithmKind, ProcessStats},
    config::RegionConfig,
    entry::NodeEntry,
    event::{EventPool, EventType, EvictionEvent},
    queue::EvictionQueue,
};

/// Eviction unit of one subtree.
///
/// Producers register events without blocking. A single consumer at a time drains them with [`Region::process`].
pub struct Region {
    fqn: Fqn,
    config: RwLock<RegionConfig>,

    tx: flume::Sender<Box<EvictionEvent>>,
    rx: flume::Receiver<Box<EvictionEvent>>,
    pool: EventPool,
    dropped: AtomicU64,

    algorithm: Mutex<Box<dyn EvictionAlgorithm>>,
    /// Pinned paths with an optional deadline in millis.
    in_use: Mutex<HashMap<Fqn, Option<u64>>>,

    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("fqn", &self.fqn)
            .field("config", &*self.config.read())
            .field("pending_events", &self.pending_events())
            .field("dropped_events", &self.dropped_events())
            .finish()
    }
}

impl Region {
    /// Create a region governing the subtree at `fqn`.
    ///
    /// Queue capacities are fixed here. The config is validated on every [`Region::process`].
    pub fn new(fqn: Fqn, config: RegionConfig, clock: Arc<dyn Clock>) -> Self {
        let (tx, rx) = flume::bounded(config.event_queue_capacity.max(1));
        let pool = EventPool::new(config.recycle_queue_capacity);
        let algorithm = config.algorithm.build();
        Self {
            fqn,
            config: RwLock::new(config),
            tx,
            rx,
            pool,
            dropped: AtomicU64::new(0),
            algorithm: Mutex::new(algorithm),
            in_use: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Root of the governed subtree.
    pub fn fqn(&self) -> &Fqn {
        &self.fqn
    }

    /// Current config.
    pub fn config(&self) -> RegionConfig {
        self.config.read().clone()
    }

    /// Time source of the region.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Replace the eviction policy. The new policy starts with an empty queue, pending events are kept.
    pub fn set_config(&self, config: RegionConfig) {
        let algorithm = config.algorithm.build();
        let mut current = self.config.write();
        if current.event_queue_capacity != config.event_queue_capacity
            || current.recycle_queue_capacity != config.recycle_queue_capacity
        {
            tracing::debug!(
                "[region]: queue capacities of region {} are fixed at creation, keep the current ones",
                self.fqn
            );
        }
        *self.algorithm.lock() = algorithm;
        *current = config;
        tracing::info!("[region]: policy of region {} replaced with {}", self.fqn, current.algorithm.kind());
    }

    /// Kind of the active policy.
    pub fn eviction_algorithm_kind(&self) -> EvictionAlgorithmKind {
        self.algorithm.lock().kind()
    }

    /// Queue an event for the next [`Region::process`]. Never blocks.
    ///
    /// Returns `false` if the event queue is full and the event was dropped.
    pub fn register_eviction_event(&self, fqn: &Fqn, kind: EventType) -> bool {
        self.register_eviction_event_with_elements(fqn, kind, kind.default_element_difference())
    }

    /// Queue an event carrying an element delta. Never blocks.
    ///
    /// Returns `false` if the event queue is full and the event was dropped.
    pub fn register_eviction_event_with_elements(&self, fqn: &Fqn, kind: EventType, elements: usize) -> bool {
        let event = self.pool.acquire(fqn.clone(), kind, elements);
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                let event = e.into_inner();
                tracing::warn!(
                    "[region]: event queue of region {} is full, drop {} {} (dropped: {})",
                    self.fqn,
                    event.kind(),
                    event.fqn(),
                    dropped
                );
                self.pool.release(event);
                false
            }
        }
    }

    /// Number of queued events.
    pub fn pending_events(&self) -> usize {
        self.rx.len()
    }

    /// Number of events dropped because the queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reuse counters of the event recycle pool.
    pub fn recycle_pool_stats(&self) -> ObjectPoolStats {
        self.pool.stats()
    }

    /// Take the next queued event without waiting.
    pub fn poll_event(&self) -> Option<Box<EvictionEvent>> {
        self.rx.try_recv().ok()
    }

    /// Give a consumed event back to the recycle pool.
    pub fn recycle_event(&self, event: Box<EvictionEvent>) {
        self.pool.release(event);
    }

    /// Drop every queued event.
    pub fn reset_eviction_queues(&self) {
        while let Some(event) = self.poll_event() {
            self.recycle_event(event);
        }
        self.algorithm.lock().reset_eviction_queue();
    }

    /// Pin `fqn` against eviction for `timeout`. A zero timeout pins until [`Region::unmark_node_currently_in_use`].
    pub fn mark_node_currently_in_use(&self, fqn: &Fqn, timeout: Duration) {
        let deadline = if timeout.is_zero() {
            None
        } else {
            Some(self.clock.now_millis().saturating_add(timeout.as_millis() as u64))
        };
        tracing::trace!("[region]: pin {} until {:?}", fqn, deadline);
        self.in_use.lock().insert(fqn.clone(), deadline);
    }

    /// Release the pin of `fqn`.
    pub fn unmark_node_currently_in_use(&self, fqn: &Fqn) {
        self.in_use.lock().remove(fqn);
    }

    /// Returns `true` if `fqn` is pinned at `now`. An expired pin is released.
    pub fn is_node_in_use(&self, fqn: &Fqn, now: u64) -> bool {
        let mut in_use = self.in_use.lock();
        match in_use.get(fqn) {
            None => false,
            Some(None) => true,
            Some(Some(deadline)) if now < *deadline => true,
            Some(Some(_)) => {
                in_use.remove(fqn);
                false
            }
        }
    }

    /// Release every pin whose deadline has passed at `now`. Returns the number of released pins.
    pub fn release_expired_pins(&self, now: u64) -> usize {
        let mut in_use = self.in_use.lock();
        let before = in_use.len();
        in_use.retain(|_, deadline| deadline.is_none_or(|at| now < at));
        let released = before - in_use.len();
        if released > 0 {
            tracing::trace!("[region]: {} released {} expired pins", self.fqn, released);
        }
        released
    }

    /// Number of pinned nodes, expired pins not yet released included.
    pub fn number_of_pinned_nodes(&self) -> usize {
        self.in_use.lock().len()
    }

    /// Returns `true` if `entry` is not pinned and the policy thresholds select it for eviction now.
    ///
    /// Must not be called from inside [`Region::process`].
    pub fn should_evict_node(&self, entry: &NodeEntry) -> bool {
        let now = self.clock.now_millis();
        if self.is_node_in_use(entry.fqn(), now) {
            return false;
        }
        self.algorithm.lock().should_evict_node(entry, now)
    }

    /// Drain pending events and evict through `action`.
    ///
    /// Expired pins are released first, and a `REMOVE_NODE` event drops the pin of its node.
    /// Fails if the region config is invalid. Callers must not run two `process` calls on the same region at once.
    pub fn process(&self, action: &dyn EvictionAction) -> Result<ProcessStats> {
        self.config.read().validate()?;
        self.release_expired_pins(self.clock.now_millis());
        let mut algorithm = self.algorithm.lock();
        algorithm.process(self, action)
    }

    /// Run `f` on the queue of the active policy.
    pub fn with_eviction_queue<R>(&self, f: impl FnOnce(&dyn EvictionQueue) -> R) -> R {
        let algorithm = self.algorithm.lock();
        f(algorithm.eviction_queue())
    }

    /// Number of tracked nodes.
    pub fn number_of_nodes(&self) -> usize {
        self.with_eviction_queue(|queue| queue.number_of_nodes())
    }

    /// Number of tracked elements.
    pub fn number_of_elements(&self) -> usize {
        self.with_eviction_queue(|queue| queue.number_of_elements())
    }
}
