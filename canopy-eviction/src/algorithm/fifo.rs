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

use super::{BaseEvictionAlgorithm, EvictionAlgorithmKind, Policy};
use crate::{config::FifoConfig, entry::NodeEntry, queue::{fifo::FifoQueue, EvictionQueue}};

/// First-in-first-out policy: evicts the oldest inserted nodes above `max_nodes`.
#[derive(Debug, Clone)]
pub struct Fifo(pub FifoConfig);

/// First-in-first-out eviction algorithm.
pub type FifoAlgorithm = BaseEvictionAlgorithm<Fifo>;

impl Policy for Fifo {
    type Queue = FifoQueue;

    fn kind(&self) -> EvictionAlgorithmKind {
        EvictionAlgorithmKind::Fifo
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

    fn should_evict_node(&self, _: &NodeEntry, queue: &FifoQueue, _: u64) -> bool {
        self.0.max_nodes.is_some_and(|max| queue.number_of_nodes() > max)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use canopy_common::{clock::ManualClock, fqn::Fqn};
    use itertools::Itertools;

    use super::*;
    use crate::{
        algorithm::EvictionAlgorithm, config::RegionConfig, event::EventType, region::Region,
        test_utils::{assert_queue_counters, RecordingAction},
    };

    fn fifo_region(config: FifoConfig) -> (Region, ManualClock) {
        let clock = ManualClock::new(0);
        let region = Region::new(Fqn::parse("/fifo"), RegionConfig::new(config), Arc::new(clock.clone()));
        (region, clock)
    }

    fn names(region: &Region) -> Vec<String> {
        region.with_eviction_queue(|q| q.iter().map(|e| e.fqn().to_string()).collect_vec())
    }

    #[test_log::test]
    fn test_fifo_keeps_latest() {
        let (region, _) = fifo_region(FifoConfig {
            max_nodes: Some(5),
            ..Default::default()
        });
        let action = RecordingAction::default();
        for i in 0..8 {
            region.register_eviction_event(&Fqn::parse(&format!("/fifo/{i}")), EventType::AddNode);
        }
        region.process(&action).unwrap();

        assert_eq!(names(&region), vec!["/fifo/3", "/fifo/4", "/fifo/5", "/fifo/6", "/fifo/7"]);
        assert_eq!(action.evicted_names(), vec!["/fifo/0", "/fifo/1", "/fifo/2"]);

        for i in (3..8).rev() {
            region.register_eviction_event(&Fqn::parse(&format!("/fifo/{i}")), EventType::VisitNode);
        }
        region.process(&action).unwrap();
        assert_eq!(names(&region), vec!["/fifo/3", "/fifo/4", "/fifo/5", "/fifo/6", "/fifo/7"]);
        region.with_eviction_queue(assert_queue_counters);
    }

    #[test_log::test]
    fn test_fifo_min_time_to_live() {
        let (region, clock) = fifo_region(FifoConfig {
            max_nodes: Some(2),
            min_time_to_live: Some(Duration::from_secs(10)),
            ..Default::default()
        });
        let action = RecordingAction::default();
        for i in 0..4 {
            region.register_eviction_event(&Fqn::parse(&format!("/fifo/{i}")), EventType::AddNode);
        }
        region.process(&action).unwrap();
        assert_eq!(region.number_of_nodes(), 4);

        clock.advance(Duration::from_secs(10));
        region.process(&action).unwrap();
        assert_eq!(names(&region), vec!["/fifo/2", "/fifo/3"]);
    }

    #[test_log::test]
    fn test_fifo_retry_refused() {
        let (region, _) = fifo_region(FifoConfig {
            max_nodes: Some(1),
            ..Default::default()
        });
        let action = RecordingAction::default();
        let a = Fqn::parse("/fifo/a");
        action.refuse(&a);
        region.register_eviction_event(&a, EventType::AddNode);
        region.register_eviction_event(&Fqn::parse("/fifo/b"), EventType::AddNode);

        let stats = region.process(&action).unwrap();
        assert_eq!(stats.evicted, 1);
        assert!(action.evicted().is_empty());
        assert_eq!(region.number_of_nodes(), 1);

        action.accept(&a);
        let stats = region.process(&action).unwrap();
        assert_eq!(stats.retried, 1);
        assert_eq!(action.evicted_names(), vec!["/fifo/a"]);
    }

    #[test]
    fn test_fifo_should_evict_node() {
        let algorithm = FifoAlgorithm::new(Fifo(FifoConfig {
            max_nodes: Some(0),
            ..Default::default()
        }));
        // Nothing tracked: the cap is not exceeded.
        assert!(!algorithm.should_evict_node(&NodeEntry::new(Fqn::parse("/a")), 0));
        assert_eq!(algorithm.kind(), EvictionAlgorithmKind::Fifo);
    }
}
