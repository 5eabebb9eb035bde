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

use canopy_common::fqn::Fqn;

/// Callback into the owning cache.
///
/// The eviction engine only keeps bookkeeping. Removing node data is left to the implementor.
pub trait EvictionAction: Send + Sync + 'static {
    /// Evict the node at `fqn`. Returns `false` if the node could not be evicted now and should be retried.
    fn evict(&self, fqn: &Fqn) -> bool;

    /// Absolute expiration time in millis stored under `key` in the data of the node at `fqn`.
    fn expiration(&self, fqn: &Fqn, key: &str) -> Option<u64> {
        let _ = (fqn, key);
        None
    }
}

impl<F> EvictionAction for F
where
    F: Fn(&Fqn) -> bool + Send + Sync + 'static,
{
    fn evict(&self, fqn: &Fqn) -> bool {
        self(fqn)
    }
}
