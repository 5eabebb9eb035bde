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

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use canopy_common::{
    clock::{Clock, SystemClock},
    error::{Error, Result},
    fqn::Fqn,
};
use itertools::Itertools;
use parking_lot::{Mutex, RwLock};

use crate::{
    action::EvictionAction,
    algorithm::ProcessStats,
    config::{EvictionConfig, RegionConfig},
    event::EventType,
    region::Region,
    timer::EvictionTimer,
};

struct RegionManagerInner {
    /// Ordered by [`Fqn`]: the root region first, then by depth, then lexicographically.
    regions: RwLock<BTreeMap<Fqn, Arc<Region>>>,
    wakeup_interval: Duration,
    clock: Arc<dyn Clock>,
    timer: Mutex<Option<EvictionTimer>>,
}

/// Owner of all regions of a cache.
///
/// Resolves the most specific region of a path and drives the periodic eviction. Cloning is cheap and clones share
/// the same regions.
#[derive(Clone)]
pub struct RegionManager {
    inner: Arc<RegionManagerInner>,
}

impl std::fmt::Debug for RegionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionManager")
            .field("regions", &self.inner.regions.read().keys().collect_vec())
            .field("wakeup_interval", &self.inner.wakeup_interval)
            .finish()
    }
}

fn nearest(regions: &BTreeMap<Fqn, Arc<Region>>, fqn: &Fqn) -> Option<Arc<Region>> {
    (0..=fqn.depth())
        .rev()
        .find_map(|depth| regions.get(&fqn.ancestor(depth)))
        .cloned()
}

impl RegionManager {
    /// Create a region manager with the system clock.
    pub fn new(config: EvictionConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a region manager with the given clock.
    ///
    /// A region configured twice gets the last config.
    pub fn with_clock(config: EvictionConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let mut regions = BTreeMap::new();
        regions.insert(
            Fqn::root(),
            Arc::new(Region::new(Fqn::root(), config.default_region, clock.clone())),
        );
        for (fqn, region_config) in config.regions {
            if let Some(region) = regions.get(&fqn) {
                tracing::warn!("[region manager]: region {} configured more than once, replace its policy", fqn);
                region.set_config(region_config);
                continue;
            }
            let region = Arc::new(Region::new(fqn.clone(), region_config, clock.clone()));
            regions.insert(fqn, region);
        }

        let inner = RegionManagerInner {
            regions: RwLock::new(regions),
            wakeup_interval: config.wakeup_interval,
            clock,
            timer: Mutex::new(None),
        };
        Ok(Self { inner: Arc::new(inner) })
    }

    /// Period of the eviction thread. Zero disables it.
    pub fn wakeup_interval(&self) -> Duration {
        self.inner.wakeup_interval
    }

    /// Time source shared by all regions.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Get the region governing `fqn`.
    ///
    /// Without `create_if_absent`, returns the region of the nearest ancestor-or-self path, falling back to the root
    /// region. With it, returns the region at exactly `fqn`, creating it with the config of the nearest region.
    pub fn get_region(&self, fqn: &Fqn, create_if_absent: bool) -> Arc<Region> {
        {
            let regions = self.inner.regions.read();
            let found = if create_if_absent {
                regions.get(fqn).cloned()
            } else {
                nearest(&regions, fqn)
            };
            if let Some(region) = found {
                return region;
            }
        }

        let fqn = if create_if_absent { fqn.clone() } else { Fqn::root() };
        let mut regions = self.inner.regions.write();
        if let Some(region) = regions.get(&fqn) {
            return region.clone();
        }
        let config = nearest(&regions, &fqn)
            .map(|region| region.config())
            .unwrap_or_default();
        let region = Arc::new(Region::new(fqn.clone(), config, self.inner.clock.clone()));
        regions.insert(fqn.clone(), region.clone());
        tracing::info!(
            "[region manager]: region {} created with policy {}",
            fqn,
            region.eviction_algorithm_kind()
        );
        region
    }

    /// Returns `true` if a region exists at exactly `fqn`.
    pub fn has_region(&self, fqn: &Fqn) -> bool {
        self.inner.regions.read().contains_key(fqn)
    }

    /// All regions, the root region first, then ascending by depth, then lexicographically.
    pub fn get_all_regions(&self) -> Vec<Arc<Region>> {
        self.inner.regions.read().values().cloned().collect_vec()
    }

    /// Set the policy of the region at exactly `fqn`, creating the region if needed.
    pub fn set_region_config(&self, fqn: &Fqn, config: RegionConfig) -> Result<Arc<Region>> {
        config.validate()?;
        let mut regions = self.inner.regions.write();
        if let Some(region) = regions.get(fqn) {
            region.set_config(config);
            return Ok(region.clone());
        }
        let region = Arc::new(Region::new(fqn.clone(), config, self.inner.clock.clone()));
        regions.insert(fqn.clone(), region.clone());
        tracing::info!(
            "[region manager]: region {} created with policy {}",
            fqn,
            region.eviction_algorithm_kind()
        );
        Ok(region)
    }

    /// Queue an event on the region governing `fqn`. Never blocks.
    pub fn register_eviction_event(&self, fqn: &Fqn, kind: EventType) -> bool {
        self.get_region(fqn, false).register_eviction_event(fqn, kind)
    }

    /// Pin `fqn` in the region governing it.
    pub fn mark_node_currently_in_use(&self, fqn: &Fqn, timeout: Duration) {
        self.get_region(fqn, false).mark_node_currently_in_use(fqn, timeout);
    }

    /// Release the pin of `fqn` in the region governing it.
    pub fn unmark_node_currently_in_use(&self, fqn: &Fqn) {
        self.get_region(fqn, false).unmark_node_currently_in_use(fqn);
    }

    /// Process every region in order.
    ///
    /// A failing region does not stop the sweep. Returns the summed stats, or the errors of the failed regions.
    pub fn process_all(&self, action: &dyn EvictionAction) -> Result<ProcessStats> {
        let mut total = ProcessStats::default();
        let mut errs = vec![];
        for region in self.get_all_regions() {
            match region.process(action) {
                Ok(stats) => {
                    total.events += stats.events;
                    total.evicted += stats.evicted;
                    total.retried += stats.retried;
                    total.skipped_in_use += stats.skipped_in_use;
                }
                Err(e) => {
                    tracing::error!("[region manager]: failed to process region {}: {}", region.fqn(), e);
                    errs.push(e);
                }
            }
        }
        if errs.is_empty() {
            Ok(total)
        } else {
            Err(Error::multiple(errs))
        }
    }

    /// Start the periodic eviction thread.
    ///
    /// Returns `false` without creating a thread if the wakeup interval is zero. Starting twice is a no-op.
    ///
    /// The thread ends once the manager is dropped. An `action` that owns a clone of this manager keeps it alive until
    /// [`RegionManager::stop_eviction_thread`].
    pub fn start_eviction_thread(&self, action: Arc<dyn EvictionAction>) -> Result<bool> {
        let interval = self.inner.wakeup_interval;
        if interval.is_zero() {
            tracing::info!("[region manager]: wakeup interval is zero, eviction thread disabled");
            return Ok(false);
        }

        let mut timer = self.inner.timer.lock();
        if timer.as_ref().is_some_and(|timer| timer.is_running()) {
            tracing::debug!("[region manager]: eviction thread is already running");
            return Ok(true);
        }

        let weak = Arc::downgrade(&self.inner);
        *timer = Some(EvictionTimer::spawn(interval, move || {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            let manager = RegionManager { inner };
            // Errors are logged per region.
            let _ = manager.process_all(action.as_ref());
            true
        })?);
        Ok(true)
    }

    /// Returns `true` if the periodic eviction thread is running.
    pub fn is_eviction_thread_running(&self) -> bool {
        self.inner
            .timer
            .lock()
            .as_ref()
            .is_some_and(|timer| timer.is_running())
    }

    /// Stop the periodic eviction thread and wait for it.
    pub fn stop_eviction_thread(&self) {
        let timer = self.inner.timer.lock().take();
        if let Some(timer) = timer {
            timer.stop();
        }
    }
}
