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

use canopy_common::{error::Result, fqn::Fqn};

use super::{BaseEvictionAlgorithm, EvictionAlgorithmKind, Policy};
use crate::{
    action::EvictionAction,
    config::ExpirationConfig,
    entry::NodeEntry,
    queue::{expiration::ExpirationQueue, EvictionQueue},
};

/// Expiration policy.
///
/// Each node carries an absolute expiration read from its data through [`EvictionAction::expiration`], or derived from
/// `time_to_live`. Expired nodes are evicted, then the earliest expiring nodes above `max_nodes`.
#[derive(Debug, Clone)]
pub struct Expiration(pub ExpirationConfig);

/// Expiration eviction algorithm.
pub type ExpirationAlgorithm = BaseEvictionAlgorithm<Expiration>;

impl Expiration {
    fn expiration_of(&self, fqn: &Fqn, now: u64, action: &dyn EvictionAction) -> Option<u64> {
        let expiration = action
            .expiration(fqn, &self.0.expiration_key_name)
            .or_else(|| {
                self.0
                    .time_to_live
                    .map(|ttl| now.saturating_add(ttl.as_millis() as u64))
            });
        if expiration.is_none() {
            if self.0.warn_no_expiration_key {
                tracing::warn!(
                    "[expiration]: node {} has no expiration under key {:?}, not tracked",
                    fqn,
                    self.0.expiration_key_name
                );
            } else {
                tracing::debug!(
                    "[expiration]: node {} has no expiration under key {:?}, not tracked",
                    fqn,
                    self.0.expiration_key_name
                );
            }
        }
        expiration
    }
}

impl Policy for Expiration {
    type Queue = ExpirationQueue;

    fn kind(&self) -> EvictionAlgorithmKind {
        EvictionAlgorithmKind::Expiration
    }

    fn validate(&self) -> Result<()> {
        self.0.validate()
    }

    fn min_time_to_live(&self) -> Option<Duration> {
        self.0.min_time_to_live
    }

    fn should_evict_node(&self, entry: &NodeEntry, queue: &ExpirationQueue, now: u64) -> bool {
        entry.expiration_time_stamp().is_some_and(|expiration| expiration <= now)
            || self.0.max_nodes.is_some_and(|max| queue.number_of_nodes() > max)
    }

    fn create_entry(&self, fqn: &Fqn, now: u64, action: &dyn EvictionAction) -> Option<NodeEntry> {
        let expiration = self.expiration_of(fqn, now, action)?;
        let mut entry = NodeEntry::with_timestamp(fqn.clone(), now);
        entry.set_number_of_node_visits(1);
        entry.set_expiration_time_stamp(Some(expiration));
        Some(entry)
    }

    fn refresh_entry(
        &self,
        queue: &mut ExpirationQueue,
        fqn: &Fqn,
        now: u64,
        action: &dyn EvictionAction,
    ) -> Result<()> {
        queue.visit_node_entry(fqn, now);
        if let Some(expiration) = self.expiration_of(fqn, now, action) {
            queue.reschedule(fqn, Some(expiration))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use canopy_common::clock::ManualClock;
    use itertools::Itertools;

    use super::*;
    use crate::{config::RegionConfig, event::EventType, region::Region, test_utils::RecordingAction};

    fn expiration_region(config: ExpirationConfig) -> (Region, ManualClock) {
        let clock = ManualClock::new(1_000);
        let region = Region::new(Fqn::parse("/exp"), RegionConfig::new(config), Arc::new(clock.clone()));
        (region, clock)
    }

    #[test_log::test]
    fn test_expiration_evicts_expired() {
        let (region, clock) = expiration_region(ExpirationConfig::default());
        let action = RecordingAction::default();
        let (a, b, c) = (Fqn::parse("/exp/a"), Fqn::parse("/exp/b"), Fqn::parse("/exp/c"));
        action.set_expiration(&a, 1_500);
        action.set_expiration(&b, 3_000);
        for fqn in [&a, &b, &c] {
            region.register_eviction_event(fqn, EventType::AddNode);
        }
        region.process(&action).unwrap();
        assert!(action.evicted().is_empty());
        // No expiration and no time to live: not tracked.
        assert_eq!(region.number_of_nodes(), 2);

        clock.set(2_000);
        region.process(&action).unwrap();
        assert_eq!(action.evicted_names(), vec!["/exp/a"]);

        // Re-adding re-reads the expiration.
        action.set_expiration(&b, 1_800);
        region.register_eviction_event(&b, EventType::AddNode);
        region.process(&action).unwrap();
        assert_eq!(action.evicted_names(), vec!["/exp/a", "/exp/b"]);
        assert_eq!(region.number_of_nodes(), 0);
    }

    #[test_log::test]
    fn test_expiration_time_to_live_and_max_nodes() {
        let (region, clock) = expiration_region(ExpirationConfig {
            time_to_live: Some(Duration::from_secs(10)),
            max_nodes: Some(2),
            ..Default::default()
        });
        let action = RecordingAction::default();
        for (i, expiration) in [(0, 9_000), (1, 5_000), (2, 7_000)] {
            let fqn = Fqn::parse(&format!("/exp/{i}"));
            action.set_expiration(&fqn, expiration);
            region.register_eviction_event(&fqn, EventType::AddNode);
        }
        region.register_eviction_event(&Fqn::parse("/exp/ttl"), EventType::AddNode);
        region.process(&action).unwrap();

        assert_eq!(action.evicted_names(), vec!["/exp/1", "/exp/2"]);
        region.with_eviction_queue(|q| {
            let left = q
                .iter()
                .map(|e| (e.fqn().to_string(), e.expiration_time_stamp()))
                .collect_vec();
            assert_eq!(
                left,
                vec![("/exp/0".to_string(), Some(9_000)), ("/exp/ttl".to_string(), Some(11_000))]
            );
        });

        clock.set(11_000);
        region.process(&action).unwrap();
        assert_eq!(region.number_of_nodes(), 0);
    }
}
