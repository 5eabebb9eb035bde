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

use std::time::Duration;

use canopy_common::error::Result;

use super::{BaseEvictionAlgorithm, EvictionAlgorithmKind, Policy, Pruner, Verdict};
use crate::{
    config::LruConfig,
    entry::NodeEntry,
    queue::{
        lru::{LruOrder, LruQueue},
        EvictionQueue,
    },
};

/// Least-recently-used policy.
///
/// Prunes in three passes: idle nodes by recency, old nodes by age, then least recently used nodes above `max_nodes`.
#[derive(Debug, Clone)]
pub struct Lru(pub LruConfig);

/// Least-recently-used eviction algorithm.
pub type LruAlgorithm = BaseEvictionAlgorithm<Lru>;

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

impl Lru {
    fn is_idle(&self, entry: &NodeEntry, now: u64) -> bool {
        self.0
            .time_to_live
            .is_some_and(|ttl| now.saturating_sub(entry.modified_time_stamp()) >= millis(ttl))
    }

    fn is_too_old(&self, entry: &NodeEntry, now: u64) -> bool {
        self.0
            .max_age
            .is_some_and(|max_age| now.saturating_sub(entry.creation_time_stamp()) >= millis(max_age))
    }

    fn is_over_capacity(&self, queue: &LruQueue) -> bool {
        self.0.max_nodes.is_some_and(|max| queue.number_of_nodes() > max)
    }

    fn pass(
        &self,
        queue: &mut LruQueue,
        pruner: &mut Pruner<'_>,
        order: LruOrder,
        predicate: impl Fn(&NodeEntry, &LruQueue) -> bool,
    ) -> Result<()> {
        let now = pruner.now();
        let mut cursor = queue.cursor_by(order);
        loop {
            let verdict = match queue.cursor_next_by(order, &mut cursor)? {
                None => break,
                Some(entry) if pruner.is_in_use(entry.fqn()) => Verdict::Skip,
                Some(entry) => self.judge_with(entry, queue, now, &predicate),
            };
            match verdict {
                Verdict::Skip => continue,
                Verdict::Stop => break,
                Verdict::Evict => {
                    let entry = queue.cursor_remove_by(order, &mut cursor)?;
                    pruner.evict(entry);
                }
            }
        }
        Ok(())
    }
}

impl Policy for Lru {
    type Queue = LruQueue;

    fn kind(&self) -> EvictionAlgorithmKind {
        EvictionAlgorithmKind::Lru
    }

    fn validate(&self) -> Result<()> {
        self.0.validate()
    }

    fn min_nodes(&self) -> Option<usize> {
        self.0.min_nodes
    }

    fn min_time_to_live(&self) -> Option<Duration> {
        self.0.min_time_to_live
    }

    fn should_evict_node(&self, entry: &NodeEntry, queue: &LruQueue, now: u64) -> bool {
        self.is_over_capacity(queue) || self.is_idle(entry, now) || self.is_too_old(entry, now)
    }

    fn prune(&self, queue: &mut LruQueue, pruner: &mut Pruner<'_>) -> Result<()> {
        let now = pruner.now();
        if self.0.time_to_live.is_some() {
            self.pass(queue, pruner, LruOrder::Recency, |entry, _| self.is_idle(entry, now))?;
        }
        if self.0.max_age.is_some() {
            self.pass(queue, pruner, LruOrder::Age, |entry, _| self.is_too_old(entry, now))?;
        }
        if self.0.max_nodes.is_some() {
            self.pass(queue, pruner, LruOrder::Recency, |_, queue| self.is_over_capacity(queue))?;
        }
        Ok(())
    }
}
