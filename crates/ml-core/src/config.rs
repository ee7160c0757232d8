//! Configuration System
//!
//! Engine settings and demo-run tuning, loaded from TOML so they can be
//! adjusted without recompiling.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default tuning file path
pub const DEFAULT_CONFIG_PATH: &str = "mlsim.toml";

/// Smallest allowed membership floor
pub const MIN_GROUP_FLOOR: usize = 2;

/// Grouping engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A group whose size drops below this is dissolved
    pub min_for_group: usize,
    /// Whether groups can themselves be grouped. Decided up front: a flat
    /// engine tears groups down without walking parents.
    pub nesting: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_for_group: MIN_GROUP_FLOOR,
            nesting: false,
        }
    }
}

impl EngineConfig {
    pub fn with_min_for_group(mut self, min_for_group: usize) -> Self {
        self.min_for_group = min_for_group;
        self
    }

    pub fn with_nesting(mut self, nesting: bool) -> Self {
        self.nesting = nesting;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_for_group < MIN_GROUP_FLOOR {
            return Err(ConfigError::Invalid(format!(
                "min_for_group must be at least {}, got {}",
                MIN_GROUP_FLOOR, self.min_for_group
            )));
        }
        Ok(())
    }
}

/// Top-level configuration for a demo run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub simulation: SimulationConfig,
    pub population: PopulationConfig,
    pub network: NetworkConfig,
    pub engine: EngineConfig,
}

/// Simulation loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub ticks: u64,
    pub snapshot_interval: u64,
    /// Ticks between graph-driven grouping passes
    pub regroup_interval: u64,
    /// Ticks between reassessment passes
    pub reassess_interval: u64,
    /// Randomize activation order each tick
    pub shuffled: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 200,
            snapshot_interval: 50,
            regroup_interval: 10,
            reassess_interval: 25,
            shuffled: true,
        }
    }
}

/// Demo population sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub villagers: usize,
    pub traders: usize,
    /// Elders are stepped once per tick regardless of grouping
    pub elders: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            villagers: 40,
            traders: 12,
            elders: 3,
        }
    }
}

/// Demo relationship network parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Kinship strength at or above which agents group together
    pub kinship_threshold: f64,
    /// Chance that any two villagers start out related
    pub link_probability: f64,
    /// Maximum change applied to a kinship strength per reassessment
    pub drift: f64,
    /// Trade goods used to tag trade links
    pub trade_goods: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            kinship_threshold: 0.5,
            link_probability: 0.08,
            drift: 0.2,
            trade_goods: vec!["salt".to_string(), "iron".to_string(), "grain".to_string()],
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::from_file(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}. Using defaults.", DEFAULT_CONFIG_PATH, e);
            Self::default()
        })
    }

    /// Serialize as pretty TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if !(0.0..=1.0).contains(&self.network.link_probability) {
            return Err(ConfigError::Invalid(format!(
                "link_probability must be within [0, 1], got {}",
                self.network.link_probability
            )));
        }
        if self.simulation.regroup_interval == 0 || self.simulation.reassess_interval == 0 {
            return Err(ConfigError::Invalid(
                "regroup_interval and reassess_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
