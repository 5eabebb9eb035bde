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

//! Region-scoped eviction engine for canopy.
//!
//! Mutations of a cache tree are reported as [`event::EvictionEvent`]s to the [`region::Region`] governing the
//! mutated path. Each region owns a policy, an ordered eviction queue and a bounded event queue. Processing a region
//! drains its events into the queue and hands the nodes the policy picks to an [`action::EvictionAction`].

/// Callback into the cache that owns the evicted data.
pub mod action;
/// Eviction algorithms: event dispatch plus one policy each.
pub mod algorithm;
pub mod config;
/// Per-node bookkeeping record.
pub mod entry;
/// Eviction events and their recycle pool.
pub mod event;
pub mod list;
/// Ordered eviction queues, one per policy.
pub mod queue;
/// A subtree with its own policy and event queue.
pub mod region;
/// Resolution of paths to regions and periodic processing.
pub mod region_manager;
/// Background thread that triggers eviction periodically.
pub mod timer;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        action::EvictionAction,
        algorithm::{EvictionAlgorithm, EvictionAlgorithmKind, ProcessStats},
        config::{
            ElementSizeConfig, EvictionAlgorithmConfig, EvictionConfig, ExpirationConfig, FifoConfig, LfuConfig,
            LruConfig, MruConfig, RegionConfig,
        },
        entry::NodeEntry,
        event::{EventType, EvictionEvent},
        queue::EvictionQueue,
        region::Region,
        region_manager::RegionManager,
    };
}
