use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::solver::Geometry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub geometry: Geometry,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            sweep: SweepConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        return Self::from_toml(&contents)
            .with_context(|| format!("invalid config file {}", path.display()));
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config = toml::from_str(contents)?;
        return Ok(config);
    }
}

/// Pose ranges explored by the `sweep` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_min_height")]
    pub min_height: f64,
    #[serde(default = "default_max_height")]
    pub max_height: f64,
    #[serde(default = "default_tilt_limit")]
    pub tilt_limit: f64,
    #[serde(default = "default_steps")]
    pub steps: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_height: default_min_height(),
            max_height: default_max_height(),
            tilt_limit: default_tilt_limit(),
            steps: default_steps(),
        }
    }
}

impl SweepConfig {
    pub fn heights(&self) -> (f64, f64) {
        return (self.min_height, self.max_height);
    }

    pub fn mid_height(&self) -> f64 {
        return (self.min_height + self.max_height) / 2.0;
    }
}

fn default_min_height() -> f64 {
    100.0
}

fn default_max_height() -> f64 {
    200.0
}

fn default_tilt_limit() -> f64 {
    0.3
}

fn default_steps() -> usize {
    21
}
