//! Configuration for the `protogonos-sim` binary: a YAML-described
//! [`protogonos_types::Spec`] plus the handful of knobs that control how
//! long the simulation runs and how loud it logs, split into a raw
//! deserializable [`Config`] and a [`ValidatedConfig`] the binary actually
//! runs with.

use std::str::FromStr;

use protogonos_types::Spec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

fn default_weight_count() -> usize {
    1
}

fn default_ticks() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub spec: Spec,
    #[serde(default = "default_weight_count")]
    pub weight_count: usize,
    #[serde(default = "default_ticks")]
    pub ticks: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Values fed to the synthetic sensor, one per tick, cycling once
    /// exhausted. Empty means "feed a constant `1.0`".
    pub sensor_sequence: Vec<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spec: Spec::default(),
            weight_count: default_weight_count(),
            ticks: default_ticks(),
            log_level: default_log_level(),
            sensor_sequence: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("weight_count must be at least 1 (got {0})")]
    ZeroWeightCount(usize),
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
}

pub struct ValidatedConfig {
    pub spec: Spec,
    pub weight_count: usize,
    pub ticks: usize,
    pub log_level: Level,
    pub sensor_sequence: Vec<f64>,
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.weight_count == 0 {
            return Err(ConfigError::ZeroWeightCount(self.weight_count));
        }
        let log_level = Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))?;
        let sensor_sequence = if self.sensor_sequence.is_empty() {
            vec![1.0]
        } else {
            self.sensor_sequence
        };
        Ok(ValidatedConfig {
            spec: self.spec,
            weight_count: self.weight_count,
            ticks: self.ticks,
            log_level,
            sensor_sequence,
        })
    }
}
