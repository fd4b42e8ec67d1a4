//! Rigdoc configuration.
//!
//! Config file: `~/.config/rigdoc/config.toml`, or the path given by
//! `--config` / `RIGDOC_CONFIG`. A missing file means defaults.

use crate::case_store::CaseStore;
use crate::features::FeatureWeights;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config path.
pub const CONFIG_ENV: &str = "RIGDOC_CONFIG";

/// Color display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Case library file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// External rule base; the built-in one is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub color: ColorMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    /// Category weight overrides
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,

    #[serde(default)]
    pub gaps: GapsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl DiagConfig {
    /// Default user config path: ~/.config/rigdoc/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Cannot determine config directory")?;
        Ok(dir.join("rigdoc").join("config.toml"))
    }

    /// Which file to load: explicit path, then `RIGDOC_CONFIG`, then the
    /// user config path.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(p) if !p.is_empty() => Ok(PathBuf::from(p)),
            _ => Self::user_config_path(),
        }
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: DiagConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (category, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                anyhow::bail!(
                    "Invalid weight for '{}': {} (must be a non-negative number)",
                    category,
                    weight
                );
            }
        }
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(CaseStore::default_path)
    }

    /// Gap log path; defaults to `rule_gaps.jsonl` next to the store.
    pub fn gap_log_path(&self) -> PathBuf {
        if let Some(path) = &self.gaps.path {
            return path.clone();
        }
        let store = self.store_path();
        match store.parent() {
            Some(dir) => dir.join("rule_gaps.jsonl"),
            None => PathBuf::from("rule_gaps.jsonl"),
        }
    }

    pub fn feature_weights(&self) -> FeatureWeights {
        FeatureWeights::default().with_overrides(&self.weights)
    }

    /// Set output color mode
    pub fn set_color_mode(&mut self, mode: &str) -> Result<()> {
        self.output.color = match mode.to_lowercase().as_str() {
            "auto" => ColorMode::Auto,
            "always" | "on" | "yes" => ColorMode::Always,
            "never" | "off" | "no" | "none" => ColorMode::Never,
            _ => anyhow::bail!("Invalid color mode: '{}'. Valid values: auto, always, never", mode),
        };
        Ok(())
    }
}
