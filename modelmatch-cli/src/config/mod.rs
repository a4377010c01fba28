//! Engine configuration
//!
//! Loaded from TOML. Every section and field has a default, so a missing file
//! or a partial file is fine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::services::matching::{CompositeWeights, MatchOptions};
use crate::services::naming::{ThesaurusEntry, ThesaurusTable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
    pub thesaurus: Vec<ThesaurusEntry>,
}

/// Path enumeration and matching mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Composed-path depth used when a command does not give one
    pub depth: usize,
    /// Hard ceiling on any requested depth
    pub max_depth: usize,
    /// Enumerate with revisits allowed instead of the strict policy
    pub use_all_paths: bool,
    /// Propagate superclass matches and reject hierarchy-breaking pairs
    pub strict: bool,
}

/// Weights of the composite entity similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub name_weight: f64,
    pub esim_weight: f64,
    pub cotopy_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// env_logger filter used when neither --log-level nor RUST_LOG is set
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            matching: MatchingConfig::default(),
            logging: LoggingConfig::default(),
            thesaurus: Vec::new(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth: 2,
            max_depth: 16,
            use_all_paths: false,
            strict: true,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let weights = CompositeWeights::default();
        Self {
            name_weight: weights.name,
            esim_weight: weights.esim,
            cotopy_weight: weights.cotopy,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Strict matching, strict path policy
    pub fn strict() -> Self {
        Self::default()
    }

    /// No hierarchy checks, all paths enumerated
    pub fn lenient() -> Self {
        Self {
            engine: EngineConfig {
                use_all_paths: true,
                strict: false,
                ..EngineConfig::default()
            },
            ..Self::default()
        }
    }

    /// `<config dir>/modelmatch/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("modelmatch").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path),
                _ => {
                    log::debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Requested depth (or the configured default) capped at `max_depth`
    pub fn effective_depth(&self, requested: Option<usize>) -> usize {
        let depth = requested.unwrap_or(self.engine.depth);
        if depth > self.engine.max_depth {
            log::warn!(
                "Depth {} exceeds max_depth {}, using {}",
                depth,
                self.engine.max_depth,
                self.engine.max_depth
            );
            return self.engine.max_depth;
        }
        depth
    }

    pub fn thesaurus_table(&self) -> ThesaurusTable {
        ThesaurusTable::from_entries(&self.thesaurus)
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            strict: self.engine.strict,
            weights: CompositeWeights {
                name: self.matching.name_weight,
                esim: self.matching.esim_weight,
                cotopy: self.matching.cotopy_weight,
            },
        }
    }
}
