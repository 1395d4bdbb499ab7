// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Editor configuration
//!
//! Settings are grouped into sections matching the editing concerns:
//! - ID allocation (strategy, optional seed)
//! - Feed-line synthesis (halving budget, reference plane linking)
//! - Port defaults (impedance)
//! - Geometry (coordinate snapping after clipping)
//! - Remote backend (VALVAR deduplication on save)
//!
//! Every field has a default so a partial TOML file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// How fresh polygon IDs are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random sampling in a range sized from the polygon count, retried on collision
    Random,
    /// Smallest unused positive integer
    Sequential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdSettings {
    pub strategy: IdStrategy,
    /// Seed for the random strategy; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for IdSettings {
    fn default() -> Self {
        Self {
            strategy: IdStrategy::Random,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedLineSettings {
    /// Number of halvings tried when probing which side of an edge is outside
    pub halving_budget: u32,
    /// Declare a LINK reference plane on the inferred wall
    pub link_reference_plane: bool,
    /// Port resistance placed at the end of the strip
    pub resistance: f64,
}

impl Default for FeedLineSettings {
    fn default() -> Self {
        Self {
            halving_budget: 16,
            link_reference_plane: true,
            resistance: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortSettings {
    pub resistance: f64,
    pub reactance: f64,
    pub inductance: f64,
    pub capacitance: f64,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            resistance: 50.0,
            reactance: 0.0,
            inductance: 0.0,
            capacitance: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    /// Decimal places kept on coordinates produced by clipping
    pub snap_decimals: u32,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self { snap_decimals: 6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub dedupe_valvars: bool,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            dedupe_valvars: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub ids: IdSettings,
    pub feedline: FeedLineSettings,
    pub port: PortSettings,
    pub geometry: GeometrySettings,
    pub remote: RemoteSettings,
}

impl EditorConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        log::debug!("[CONF] Loaded config from {}", path.as_ref().display());
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EditorConfig::from_toml(
            r#"
[ids]
strategy = "sequential"

[feedline]
halving_budget = 4
"#,
        )
        .unwrap();

        assert_eq!(config.ids.strategy, IdStrategy::Sequential);
        assert_eq!(config.ids.seed, None);
        assert_eq!(config.feedline.halving_budget, 4);
        assert!(config.feedline.link_reference_plane);
        assert_eq!(config.port.resistance, 50.0);
        assert_eq!(config.geometry.snap_decimals, 6);
    }

    #[test]
    fn test_empty_config() {
        let config = EditorConfig::from_toml("").unwrap();
        assert_eq!(config.ids.strategy, IdStrategy::Random);
        assert!(config.remote.dedupe_valvars);
    }

    #[test]
    fn test_bad_strategy_is_rejected() {
        assert!(EditorConfig::from_toml("[ids]\nstrategy = \"fancy\"\n").is_err());
    }
}
