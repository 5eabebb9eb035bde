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
use crate::{config::LfuConfig, entry::NodeEntry, queue::{lfu::LfuQueue, EvictionQueue}};

/// Least-frequently-used policy.
///
/// Evicts the least visited nodes above `max_nodes`, and down to `min_nodes` when it is set.
#[derive(Debug, Clone)]
pub struct Lfu(pub LfuConfig);

/// Least-frequently-used eviction algorithm.
pub type LfuAlgorithm = BaseEvictionAlgorithm<Lfu>;

impl Policy for Lfu {
    type Queue = LfuQueue;

    fn kind(&self) -> EvictionAlgorithmKind {
        EvictionAlgorithmKind::Lfu
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

    fn should_evict_node(&self, _: &NodeEntry, queue: &LfuQueue, _: u64) -> bool {
        let nodes = queue.number_of_nodes();
        self.0.max_nodes.is_some_and(|max| nodes > max) || self.0.min_nodes.is_some_and(|min| nodes > min)
    }
}
