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

pub use canopy_common::{
    clock::{Clock, ManualClock, SystemClock},
    error::{Error, MultipleError, Result},
    fqn::Fqn,
};
pub use canopy_eviction::{
    action::EvictionAction,
    algorithm::{EvictionAlgorithm, EvictionAlgorithmKind, ProcessStats},
    config::{
        ElementSizeConfig, EvictionAlgorithmConfig, EvictionConfig, ExpirationConfig, FifoConfig, LfuConfig, LruConfig,
        MruConfig, RegionConfig,
    },
    entry::NodeEntry,
    event::{EventType, EvictionEvent},
    list::{Cursor, EvictionQueueList},
    queue::EvictionQueue,
    region::Region,
    region_manager::RegionManager,
    timer::EvictionTimer,
};
