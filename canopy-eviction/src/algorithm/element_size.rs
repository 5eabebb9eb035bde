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
use crate::{
    config::ElementSizeConfig,
    entry::NodeEntry,
    queue::{element_size::ElementSizeQueue, EvictionQueue},
};

/// Element-count policy: evicts nodes holding more than `max_elements_per_node`, largest first, and the largest
/// nodes above `max_nodes`.
#[derive(Debug, Clone)]
pub struct ElementSize(pub ElementSizeConfig);

/// Element-count eviction algorithm.
pub type ElementSizeAlgorithm = BaseEvictionAlgorithm<ElementSize>;

impl Policy for ElementSize {
    type Queue = ElementSizeQueue;

    fn kind(&self) -> EvictionAlgorithmKind {
        EvictionAlgorithmKind::ElementSize
    }

    fn validate(&self) -> Result<()> {
        self.0.validate()
    }

    fn min_time_to_live(&self) -> Option<Duration> {
        self.0.min_time_to_live
    }

    fn should_evict_node(&self, entry: &NodeEntry, queue: &ElementSizeQueue, _: u64) -> bool {
        self.0.max_nodes.is_some_and(|max| queue.number_of_nodes() > max)
            || self
                .0
                .max_elements_per_node
                .is_some_and(|max| entry.number_of_elements() > max)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use canopy_common::{clock::ManualClock, fqn::Fqn};
    use itertools::Itertools;

    use super::*;
    use crate::{
        config::RegionConfig, event::EventType, region::Region,
        test_utils::{assert_queue_counters, RecordingAction},
    };

    fn fqn(i: usize) -> Fqn {
        Fqn::parse(&format!("/size/{i}"))
    }

    #[test_log::test]
    fn test_element_size_eviction() {
        let region = Region::new(
            Fqn::parse("/size"),
            RegionConfig::new(ElementSizeConfig {
                max_nodes: Some(10),
                max_elements_per_node: Some(6),
                ..Default::default()
            }),
            Arc::new(ManualClock::new(0)),
        );
        let action = RecordingAction::default();
        for i in 0..10 {
            region.register_eviction_event(&fqn(i), EventType::AddNode);
            if i % 2 == 0 {
                for _ in 0..i {
                    region.register_eviction_event(&fqn(i), EventType::AddElement);
                }
            }
        }
        region.process(&action).unwrap();

        assert_eq!(action.evicted_names(), vec!["/size/8"]);
        assert_eq!(region.number_of_nodes(), 9);
        assert_eq!(region.number_of_elements(), 12);

        region.with_eviction_queue(|q| {
            let counts = q.iter().map(|e| e.number_of_elements()).collect_vec();
            assert_eq!(counts, vec![6, 4, 2, 0, 0, 0, 0, 0, 0]);
            assert_queue_counters(q);
        });
    }

    #[test_log::test]
    fn test_element_size_removals() {
        let region = Region::new(
            Fqn::parse("/size"),
            RegionConfig::new(ElementSizeConfig {
                max_elements_per_node: Some(3),
                ..Default::default()
            }),
            Arc::new(ManualClock::new(0)),
        );
        let action = RecordingAction::default();
        region.register_eviction_event_with_elements(&fqn(0), EventType::AddNode, 5);
        region.register_eviction_event_with_elements(&fqn(1), EventType::AddElement, 2);
        region.register_eviction_event_with_elements(&fqn(0), EventType::RemoveElement, 2);
        region.register_eviction_event_with_elements(&fqn(2), EventType::RemoveElement, 2);
        region.process(&action).unwrap();

        assert!(action.evicted().is_empty());
        assert_eq!(region.number_of_nodes(), 2);
        assert_eq!(region.number_of_elements(), 5);

        region.register_eviction_event(&fqn(1), EventType::AddElement);
        region.register_eviction_event(&fqn(1), EventType::AddElement);
        region.register_eviction_event_with_elements(&fqn(0), EventType::RemoveElement, 10);
        region.process(&action).unwrap();
        assert_eq!(action.evicted_names(), vec!["/size/1"]);
        assert_eq!(region.number_of_elements(), 0);
    }
}
