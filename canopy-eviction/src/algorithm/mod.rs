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

use std::{collections::VecDeque, fmt::Display, time::Duration};

use canopy_common::{error::Result, fqn::Fqn};

use crate::{
    action::EvictionAction,
    config::EvictionAlgorithmConfig,
    entry::NodeEntry,
    event::{EventType, EvictionEvent},
    queue::EvictionQueue,
    region::Region,
};

/// Evicts nodes holding too many elements.
pub mod element_size;
/// Evicts nodes past their expiration time.
pub mod expiration;
/// Evicts the first inserted nodes above a node cap.
pub mod fifo;
/// Evicts the least frequently used nodes.
pub mod lfu;
/// Evicts idle, old and least recently used nodes.
pub mod lru;
/// Evicts the most recently used nodes above a node cap.
pub mod mru;
/// Never evicts.
pub mod null;

/// Maximum number of failed evictions kept for retry per region.
pub const RETRY_QUEUE_CAPACITY: usize = 4096;

/// Eviction policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionAlgorithmKind {
    /// Least recently used.
    Lru,
    /// Least frequently used.
    Lfu,
    /// Most recently used.
    Mru,
    /// First in first out.
    Fifo,
    /// Largest element count first.
    ElementSize,
    /// Explicit expiration time.
    Expiration,
    /// Never evict.
    Null,
}

impl Display for EvictionAlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EvictionAlgorithmKind::Lru => "lru",
            EvictionAlgorithmKind::Lfu => "lfu",
            EvictionAlgorithmKind::Mru => "mru",
            EvictionAlgorithmKind::Fifo => "fifo",
            EvictionAlgorithmKind::ElementSize => "element size",
            EvictionAlgorithmKind::Expiration => "expiration",
            EvictionAlgorithmKind::Null => "null",
        };
        write!(f, "{s}")
    }
}

/// Counters of one [`EvictionAlgorithm::process`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStats {
    /// Events drained from the region.
    pub events: usize,
    /// Entries selected for eviction.
    pub evicted: usize,
    /// Previously failed evictions tried again.
    pub retried: usize,
    /// Eviction candidates skipped because they are pinned.
    pub skipped_in_use: usize,
}

/// Consumer side of a region: drains its events and emits eviction decisions.
pub trait EvictionAlgorithm: Send + Sync + 'static {
    /// Policy kind.
    fn kind(&self) -> EvictionAlgorithmKind;

    /// The queue of tracked entries.
    fn eviction_queue(&self) -> &dyn EvictionQueue;

    /// Returns `true` if the policy thresholds select `entry` for eviction at `now`.
    ///
    /// Pins are owned by the region and are not checked here. `process` skips pinned candidates,
    /// and [`Region::should_evict_node`] combines both checks.
    fn should_evict_node(&self, entry: &NodeEntry, now: u64) -> bool;

    /// Drain the events queued on `region` at entry, update the queue, then evict through `action`.
    ///
    /// Fails only on an invalid policy config.
    fn process(&mut self, region: &Region, action: &dyn EvictionAction) -> Result<ProcessStats>;

    /// Forget every tracked entry and pending retry.
    fn reset_eviction_queue(&mut self);
}

/// Decision about one eviction candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Evict the candidate.
    Evict,
    /// Leave the candidate and look at the next one.
    Skip,
    /// Leave the candidate and stop the pass.
    Stop,
}

/// Thresholds and queue flavor of one eviction policy.
pub trait Policy: Send + Sync + 'static {
    /// Queue implementation of the policy.
    type Queue: EvictionQueue + Default;

    /// Policy kind.
    fn kind(&self) -> EvictionAlgorithmKind;

    /// Check the policy config.
    fn validate(&self) -> Result<()>;

    /// Floor below which nothing is evicted.
    fn min_nodes(&self) -> Option<usize> {
        None
    }

    /// Entries younger than this are never evicted.
    fn min_time_to_live(&self) -> Option<Duration>;

    /// Policy specific predicate, evaluated from the head of the queue.
    fn should_evict_node(&self, entry: &NodeEntry, queue: &Self::Queue, now: u64) -> bool;

    /// Judge a candidate against the floor, the minimum time to live and the policy predicate.
    fn judge(&self, entry: &NodeEntry, queue: &Self::Queue, now: u64) -> Verdict {
        self.judge_with(entry, queue, now, |entry, queue| {
            self.should_evict_node(entry, queue, now)
        })
    }

    /// Like [`Policy::judge`], with `predicate` in place of [`Policy::should_evict_node`].
    fn judge_with(
        &self,
        entry: &NodeEntry,
        queue: &Self::Queue,
        now: u64,
        predicate: impl FnOnce(&NodeEntry, &Self::Queue) -> bool,
    ) -> Verdict {
        if self.min_nodes().is_some_and(|min| queue.number_of_nodes() <= min) {
            return Verdict::Stop;
        }
        if let Some(min_ttl) = self.min_time_to_live() {
            if now.saturating_sub(entry.creation_time_stamp()) < min_ttl.as_millis() as u64 {
                return Verdict::Skip;
            }
        }
        if predicate(entry, queue) {
            Verdict::Evict
        } else {
            Verdict::Stop
        }
    }

    /// Build the entry of a newly seen node. `None` leaves the node untracked.
    fn create_entry(&self, fqn: &Fqn, now: u64, action: &dyn EvictionAction) -> Option<NodeEntry> {
        let _ = action;
        let mut entry = NodeEntry::with_timestamp(fqn.clone(), now);
        entry.set_number_of_node_visits(1);
        Some(entry)
    }

    /// React to an add of an already tracked node.
    fn refresh_entry(&self, queue: &mut Self::Queue, fqn: &Fqn, now: u64, action: &dyn EvictionAction) -> Result<()> {
        let _ = action;
        queue.visit_node_entry(fqn, now);
        Ok(())
    }

    /// Select and evict entries. Walks the queue from its head by default.
    fn prune(&self, queue: &mut Self::Queue, pruner: &mut Pruner<'_>) -> Result<()> {
        let now = pruner.now();
        let mut cursor = queue.cursor();
        loop {
            let verdict = match queue.cursor_next(&mut cursor)? {
                None => break,
                Some(entry) if pruner.is_in_use(entry.fqn()) => Verdict::Skip,
                Some(entry) => self.judge(entry, queue, now),
            };
            match verdict {
                Verdict::Skip => continue,
                Verdict::Stop => break,
                Verdict::Evict => {
                    let entry = queue.cursor_remove(&mut cursor)?;
                    pruner.evict(entry);
                }
            }
        }
        Ok(())
    }
}

/// Eviction context handed to [`Policy::prune`].
pub struct Pruner<'a> {
    kind: EvictionAlgorithmKind,
    region: &'a Region,
    action: &'a dyn EvictionAction,
    now: u64,
    stats: &'a mut ProcessStats,
    retry: &'a mut VecDeque<Fqn>,
}

impl Pruner<'_> {
    /// Time of the current process call.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Returns `true` if `fqn` is pinned in the region.
    pub fn is_in_use(&mut self, fqn: &Fqn) -> bool {
        let in_use = self.region.is_node_in_use(fqn, self.now);
        if in_use {
            tracing::trace!("[{}]: skip {} in use", self.kind, fqn);
            self.stats.skipped_in_use += 1;
        }
        in_use
    }

    /// Emit the eviction of a removed entry. A refused eviction is retried in the next process call.
    pub fn evict(&mut self, entry: NodeEntry) {
        tracing::trace!("[{}]: evict {}", self.kind, entry.fqn());
        self.stats.evicted += 1;
        if !self.action.evict(entry.fqn()) {
            tracing::warn!("[{}]: failed to evict {}, retry in next cycle", self.kind, entry.fqn());
            push_retry(self.retry, entry.fqn().clone());
        }
    }
}

fn push_retry(retry: &mut VecDeque<Fqn>, fqn: Fqn) {
    if retry.len() >= RETRY_QUEUE_CAPACITY {
        if let Some(dropped) = retry.pop_front() {
            tracing::warn!("[eviction]: retry queue is full, give up evicting {}", dropped);
        }
    }
    retry.push_back(fqn);
}

/// Event dispatch shared by every policy.
pub struct BaseEvictionAlgorithm<P: Policy> {
    policy: P,
    queue: P::Queue,
    retry: VecDeque<Fqn>,
}

impl<P: Policy> BaseEvictionAlgorithm<P> {
    /// Create an algorithm with an empty queue.
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            queue: P::Queue::default(),
            retry: VecDeque::new(),
        }
    }

    /// The policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The concrete queue.
    pub fn queue(&self) -> &P::Queue {
        &self.queue
    }

    /// Paths waiting for an eviction retry.
    pub fn pending_retries(&self) -> usize {
        self.retry.len()
    }

    fn retry_failed(&mut self, action: &dyn EvictionAction, stats: &mut ProcessStats) {
        for _ in 0..self.retry.len() {
            let Some(fqn) = self.retry.pop_front() else {
                break;
            };
            stats.retried += 1;
            if action.evict(&fqn) {
                tracing::debug!("[{}]: evicted {} on retry", self.policy.kind(), fqn);
            } else {
                self.retry.push_back(fqn);
            }
        }
    }

    fn track(&mut self, fqn: &Fqn, elements: usize, now: u64, action: &dyn EvictionAction) {
        let Some(mut entry) = self.policy.create_entry(fqn, now, action) else {
            return;
        };
        entry.set_number_of_elements(elements);
        if let Err(e) = self.queue.add_node_entry(entry) {
            tracing::debug!("[{}]: failed to track {}: {}", self.policy.kind(), fqn, e);
        }
    }

    fn handle_event(&mut self, event: &EvictionEvent, now: u64, action: &dyn EvictionAction) {
        let fqn = event.fqn();
        let kind = self.policy.kind();
        tracing::trace!("[{}]: handle {} {}", kind, event.kind(), fqn);
        match event.kind() {
            EventType::AddNode => {
                if self.queue.contains_node_entry(fqn) {
                    if let Err(e) = self.policy.refresh_entry(&mut self.queue, fqn, now, action) {
                        tracing::debug!("[{}]: failed to refresh {}: {}", kind, fqn, e);
                    }
                } else {
                    self.track(fqn, event.element_difference(), now, action);
                }
            }
            EventType::RemoveNode => {
                if self.queue.remove_node_entry(fqn).is_none() {
                    tracing::debug!("[{}]: remove untracked node {}", kind, fqn);
                }
            }
            EventType::VisitNode => {
                if !self.queue.visit_node_entry(fqn, now) {
                    tracing::debug!("[{}]: visit untracked node {}, track it", kind, fqn);
                    self.track(fqn, 0, now, action);
                }
            }
            EventType::AddElement => {
                if !self
                    .queue
                    .modify_element_count(fqn, event.signed_element_difference(), now)
                {
                    tracing::debug!("[{}]: add element to untracked node {}, track it", kind, fqn);
                    self.track(fqn, event.element_difference(), now, action);
                }
            }
            EventType::RemoveElement => {
                if !self
                    .queue
                    .modify_element_count(fqn, event.signed_element_difference(), now)
                {
                    tracing::debug!("[{}]: remove element from untracked node {}", kind, fqn);
                }
            }
        }
    }
}

impl<P: Policy> EvictionAlgorithm for BaseEvictionAlgorithm<P> {
    fn kind(&self) -> EvictionAlgorithmKind {
        self.policy.kind()
    }

    fn eviction_queue(&self) -> &dyn EvictionQueue {
        &self.queue
    }

    fn should_evict_node(&self, entry: &NodeEntry, now: u64) -> bool {
        self.policy.judge(entry, &self.queue, now) == Verdict::Evict
    }

    fn process(&mut self, region: &Region, action: &dyn EvictionAction) -> Result<ProcessStats> {
        self.policy.validate()?;

        let now = region.clock().now_millis();
        let mut stats = ProcessStats::default();

        self.retry_failed(action, &mut stats);

        let batch = region.pending_events();
        for _ in 0..batch {
            let Some(event) = region.poll_event() else {
                break;
            };
            if event.kind() == EventType::RemoveNode {
                region.unmark_node_currently_in_use(event.fqn());
            }
            self.handle_event(&event, now, action);
            region.recycle_event(event);
            stats.events += 1;
        }

        self.queue.resort_eviction_queue();

        let mut pruner = Pruner {
            kind: self.policy.kind(),
            region,
            action,
            now,
            stats: &mut stats,
            retry: &mut self.retry,
        };
        self.policy.prune(&mut self.queue, &mut pruner)?;

        self.queue.prune();

        tracing::trace!(
            "[{}]: region {} processed, stats: {:?}, nodes: {}",
            self.policy.kind(),
            region.fqn(),
            stats,
            self.queue.number_of_nodes()
        );
        Ok(stats)
    }

    fn reset_eviction_queue(&mut self) {
        self.queue.clear();
        self.retry.clear();
    }
}

impl EvictionAlgorithmConfig {
    /// Build the algorithm of this config.
    pub fn build(&self) -> Box<dyn EvictionAlgorithm> {
        match self {
            EvictionAlgorithmConfig::Lru(config) => Box::new(lru::LruAlgorithm::new(lru::Lru(config.clone()))),
            EvictionAlgorithmConfig::Lfu(config) => Box::new(lfu::LfuAlgorithm::new(lfu::Lfu(config.clone()))),
            EvictionAlgorithmConfig::Mru(config) => Box::new(mru::MruAlgorithm::new(mru::Mru(config.clone()))),
            EvictionAlgorithmConfig::Fifo(config) => Box::new(fifo::FifoAlgorithm::new(fifo::Fifo(config.clone()))),
            EvictionAlgorithmConfig::ElementSize(config) => Box::new(element_size::ElementSizeAlgorithm::new(
                element_size::ElementSize(config.clone()),
            )),
            EvictionAlgorithmConfig::Expiration(config) => Box::new(expiration::ExpirationAlgorithm::new(
                expiration::Expiration(config.clone()),
            )),
            EvictionAlgorithmConfig::Null => Box::new(null::NullAlgorithm::new(null::Null)),
        }
    }

    /// Kind of the configured policy.
    pub fn kind(&self) -> EvictionAlgorithmKind {
        match self {
            EvictionAlgorithmConfig::Lru(_) => EvictionAlgorithmKind::Lru,
            EvictionAlgorithmConfig::Lfu(_) => EvictionAlgorithmKind::Lfu,
            EvictionAlgorithmConfig::Mru(_) => EvictionAlgorithmKind::Mru,
            EvictionAlgorithmConfig::Fifo(_) => EvictionAlgorithmKind::Fifo,
            EvictionAlgorithmConfig::ElementSize(_) => EvictionAlgorithmKind::ElementSize,
            EvictionAlgorithmConfig::Expiration(_) => EvictionAlgorithmKind::Expiration,
            EvictionAlgorithmConfig::Null => EvictionAlgorithmKind::Null,
        }
    }
}
