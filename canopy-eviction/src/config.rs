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

//! Eviction configuration.
//!
//! Every numeric limit is optional: `None` means unbounded or disabled.

use std::time::Duration;

use canopy_common::{
    error::{Error, Result},
    fqn::Fqn,
};
use serde::{Deserialize, Serialize};

/// Default event queue capacity of a region.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 200_000;
/// Default recycle pool capacity of a region.
pub const DEFAULT_RECYCLE_QUEUE_CAPACITY: usize = 1_024;
/// Default wakeup interval of the eviction timer.
pub const DEFAULT_WAKEUP_INTERVAL: Duration = Duration::from_secs(5);
/// Default node data key that holds an absolute expiration time in millis.
pub const DEFAULT_EXPIRATION_KEY_NAME: &str = "expiration";

fn check_floor(name: &str, min_nodes: Option<usize>, max_nodes: Option<usize>) -> Result<()> {
    if let (Some(min), Some(max)) = (min_nodes, max_nodes) {
        if min > max {
            return Err(Error::Config(format!(
                "{name}: min_nodes ({min}) must not be greater than max_nodes ({max})"
            )));
        }
    }
    Ok(())
}

fn require<T>(name: &str, field: &str, value: Option<T>) -> Result<()> {
    match value {
        Some(_) => Ok(()),
        None => Err(Error::Config(format!("{name}: {field} must be set"))),
    }
}

/// Least-recently-used eviction config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LruConfig {
    /// Evict least recently used nodes while the region holds more nodes.
    pub max_nodes: Option<usize>,
    /// Never evict below this many nodes.
    pub min_nodes: Option<usize>,
    /// Evict nodes idle for at least this long.
    pub time_to_live: Option<Duration>,
    /// Evict nodes created at least this long ago, regardless of access.
    pub max_age: Option<Duration>,
    /// Never evict nodes younger than this.
    pub min_time_to_live: Option<Duration>,
}

impl LruConfig {
    /// Check the config.
    pub fn validate(&self) -> Result<()> {
        check_floor("lru", self.min_nodes, self.max_nodes)
    }
}

/// Least-frequently-used eviction config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LfuConfig {
    /// Evict least frequently used nodes while the region holds more nodes.
    pub max_nodes: Option<usize>,
    /// Floor and target: evict least frequently used nodes down to this many.
    pub min_nodes: Option<usize>,
    /// Never evict nodes younger than this.
    pub min_time_to_live: Option<Duration>,
}

impl LfuConfig {
    /// Check the config.
    pub fn validate(&self) -> Result<()> {
        check_floor("lfu", self.min_nodes, self.max_nodes)
    }
}

/// Most-recently-used eviction config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MruConfig {
    /// Evict most recently used nodes while the region holds more nodes. Required.
    pub max_nodes: Option<usize>,
    /// Never evict below this many nodes.
    pub min_nodes: Option<usize>,
    /// Never evict nodes younger than this.
    pub min_time_to_live: Option<Duration>,
}

impl MruConfig {
    /// Check the config.
    pub fn validate(&self) -> Result<()> {
        require("mru", "max_nodes", self.max_nodes)?;
        check_floor("mru", self.min_nodes, self.max_nodes)
    }
}

/// First-in-first-out eviction config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FifoConfig {
    /// Evict the oldest inserted nodes while the region holds more nodes. Required.
    pub max_nodes: Option<usize>,
    /// Never evict below this many nodes.
    pub min_nodes: Option<usize>,
    /// Never evict nodes younger than this.
    pub min_time_to_live: Option<Duration>,
}

impl FifoConfig {
    /// Check the config.
    pub fn validate(&self) -> Result<()> {
        require("fifo", "max_nodes", self.max_nodes)?;
        check_floor("fifo", self.min_nodes, self.max_nodes)
    }
}

/// Element-count eviction config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSizeConfig {
    /// Evict the largest nodes while the region holds more nodes.
    pub max_nodes: Option<usize>,
    /// Evict nodes holding more elements than this. Required.
    pub max_elements_per_node: Option<usize>,
    /// Never evict nodes younger than this.
    pub min_time_to_live: Option<Duration>,
}

impl ElementSizeConfig {
    /// Check the config.
    pub fn validate(&self) -> Result<()> {
        require("element size", "max_elements_per_node", self.max_elements_per_node)
    }
}

/// Expiration-time eviction config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpirationConfig {
    /// Node data key that holds the absolute expiration time in millis.
    pub expiration_key_name: String,
    /// Log nodes without an expiration at `warn` instead of `debug`.
    pub warn_no_expiration_key: bool,
    /// Expire nodes without an explicit expiration this long after they are added.
    pub time_to_live: Option<Duration>,
    /// Evict the earliest expiring nodes while the region holds more nodes.
    pub max_nodes: Option<usize>,
    /// Never evict nodes younger than this.
    pub min_time_to_live: Option<Duration>,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            expiration_key_name: DEFAULT_EXPIRATION_KEY_NAME.to_string(),
            warn_no_expiration_key: false,
            time_to_live: None,
            max_nodes: None,
            min_time_to_live: None,
        }
    }
}

impl ExpirationConfig {
    /// Check the config.
    pub fn validate(&self) -> Result<()> {
        if self.expiration_key_name.is_empty() {
            return Err(Error::Config("expiration: expiration_key_name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Eviction policy of a region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EvictionAlgorithmConfig {
    /// Least recently used.
    Lru(LruConfig),
    /// Least frequently used.
    Lfu(LfuConfig),
    /// Most recently used.
    Mru(MruConfig),
    /// First in first out.
    Fifo(FifoConfig),
    /// Largest element count first.
    ElementSize(ElementSizeConfig),
    /// Explicit expiration time.
    Expiration(ExpirationConfig),
    /// Never evict.
    #[default]
    Null,
}

impl EvictionAlgorithmConfig {
    /// Check the config.
    pub fn validate(&self) -> Result<()> {
        match self {
            EvictionAlgorithmConfig::Lru(config) => config.validate(),
            EvictionAlgorithmConfig::Lfu(config) => config.validate(),
            EvictionAlgorithmConfig::Mru(config) => config.validate(),
            EvictionAlgorithmConfig::Fifo(config) => config.validate(),
            EvictionAlgorithmConfig::ElementSize(config) => config.validate(),
            EvictionAlgorithmConfig::Expiration(config) => config.validate(),
            EvictionAlgorithmConfig::Null => Ok(()),
        }
    }
}

impl From<LruConfig> for EvictionAlgorithmConfig {
    fn from(config: LruConfig) -> Self {
        Self::Lru(config)
    }
}

impl From<LfuConfig> for EvictionAlgorithmConfig {
    fn from(config: LfuConfig) -> Self {
        Self::Lfu(config)
    }
}

impl From<MruConfig> for EvictionAlgorithmConfig {
    fn from(config: MruConfig) -> Self {
        Self::Mru(config)
    }
}

impl From<FifoConfig> for EvictionAlgorithmConfig {
    fn from(config: FifoConfig) -> Self {
        Self::Fifo(config)
    }
}

impl From<ElementSizeConfig> for EvictionAlgorithmConfig {
    fn from(config: ElementSizeConfig) -> Self {
        Self::ElementSize(config)
    }
}

impl From<ExpirationConfig> for EvictionAlgorithmConfig {
    fn from(config: ExpirationConfig) -> Self {
        Self::Expiration(config)
    }
}

/// Per-region config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Eviction policy.
    pub algorithm: EvictionAlgorithmConfig,
    /// Bound of the region's event queue.
    pub event_queue_capacity: usize,
    /// Bound of the region's event recycle pool.
    pub recycle_queue_capacity: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            algorithm: EvictionAlgorithmConfig::default(),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            recycle_queue_capacity: DEFAULT_RECYCLE_QUEUE_CAPACITY,
        }
    }
}

impl RegionConfig {
    /// Create a region config with default capacities.
    pub fn new(algorithm: impl Into<EvictionAlgorithmConfig>) -> Self {
        Self {
            algorithm: algorithm.into(),
            ..Default::default()
        }
    }

    /// Set the event queue capacity.
    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    /// Set the recycle pool capacity.
    pub fn with_recycle_queue_capacity(mut self, capacity: usize) -> Self {
        self.recycle_queue_capacity = capacity;
        self
    }

    /// Check the config.
    pub fn validate(&self) -> Result<()> {
        if self.event_queue_capacity == 0 {
            return Err(Error::Config("event_queue_capacity must be positive".to_string()));
        }
        self.algorithm.validate()
    }
}

/// Eviction config of a whole cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Period of the eviction timer. Zero disables the timer.
    pub wakeup_interval: Duration,
    /// Config of the root region.
    pub default_region: RegionConfig,
    /// Configs of the other regions.
    pub regions: Vec<(Fqn, RegionConfig)>,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            wakeup_interval: DEFAULT_WAKEUP_INTERVAL,
            default_region: RegionConfig::default(),
            regions: vec![],
        }
    }
}

impl EvictionConfig {
    /// Set the wakeup interval.
    pub fn with_wakeup_interval(mut self, interval: Duration) -> Self {
        self.wakeup_interval = interval;
        self
    }

    /// Set the root region config.
    pub fn with_default_region(mut self, config: RegionConfig) -> Self {
        self.default_region = config;
        self
    }

    /// Add a region config.
    pub fn with_region(mut self, fqn: impl Into<Fqn>, config: RegionConfig) -> Self {
        self.regions.push((fqn.into(), config));
        self
    }

    /// Check the config.
    pub fn validate(&self) -> Result<()> {
        self.default_region.validate()?;
        for (fqn, config) in self.regions.iter() {
            config
                .validate()
                .map_err(|e| Error::Config(format!("region {fqn}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(FifoConfig::default().validate().is_err());
        assert!(FifoConfig {
            max_nodes: Some(5),
            ..Default::default()
        }
        .validate()
        .is_ok());
        assert!(LruConfig {
            max_nodes: Some(1),
            min_nodes: Some(2),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(ElementSizeConfig::default().validate().unwrap_err().is_config());
        assert!(RegionConfig::new(LfuConfig::default())
            .with_event_queue_capacity(0)
            .validate()
            .is_err());

        let config = EvictionConfig::default().with_region("/a", RegionConfig::new(MruConfig::default()));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("region /a"));
    }

    #[test]
    fn test_deserialize() {
        let json = r#"{
            "wakeup_interval": { "secs": 0, "nanos": 0 },
            "default_region": { "algorithm": { "policy": "lru", "max_nodes": 100 } },
            "regions": [
                ["/org/data", { "algorithm": { "policy": "fifo", "max_nodes": 5 }, "event_queue_capacity": 10 }],
                ["/test", { "algorithm": { "policy": "null" } }]
            ]
        }"#;
        let config: EvictionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.wakeup_interval, Duration::ZERO);
        assert_eq!(
            config.default_region.algorithm,
            EvictionAlgorithmConfig::Lru(LruConfig {
                max_nodes: Some(100),
                ..Default::default()
            })
        );
        assert_eq!(config.default_region.event_queue_capacity, DEFAULT_EVENT_QUEUE_CAPACITY);
        assert_eq!(config.regions[0].0, Fqn::parse("/org/data"));
        assert_eq!(config.regions[0].1.event_queue_capacity, 10);
        assert_eq!(config.regions[1].1.algorithm, EvictionAlgorithmConfig::Null);
        config.validate().unwrap();
    }
}
