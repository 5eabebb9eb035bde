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
use crate::{entry::NodeEntry, queue::null::NullQueue};

/// A policy that never evicts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Null;

/// No-op eviction algorithm.
pub type NullAlgorithm = BaseEvictionAlgorithm<Null>;

impl Policy for Null {
    type Queue = NullQueue;

    fn kind(&self) -> EvictionAlgorithmKind {
        EvictionAlgorithmKind::Null
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn min_time_to_live(&self) -> Option<Duration> {
        None
    }

    fn should_evict_node(&self, _: &NodeEntry, _: &NullQueue, _: u64) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use canopy_common::{clock::ManualClock, fqn::Fqn};

    use super::*;
    use crate::{config::RegionConfig, event::EventType, region::Region, test_utils::RecordingAction};

    #[test_log::test]
    fn test_null_drains_without_evicting() {
        let region = Region::new(Fqn::root(), RegionConfig::default(), Arc::new(ManualClock::new(0)));
        let action = RecordingAction::default();
        for i in 0..100 {
            region.register_eviction_event(&Fqn::parse(&format!("/{i}")), EventType::AddNode);
        }
        let stats = region.process(&action).unwrap();
        assert_eq!(stats.events, 100);
        assert_eq!(stats.evicted, 0);
        assert_eq!(region.pending_events(), 0);
        assert_eq!(region.number_of_nodes(), 0);
        assert!(action.evicted().is_empty());
    }
}
