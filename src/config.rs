//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.censuslens.toml` files.

use crate::cli::Args;
use crate::loader::TableSchema;
use crate::models::Level;
use crate::report::ReportOptions;
use crate::resolver::OverrideTable;
use crate::taxonomy::{default_rules, CategoryRule};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".censuslens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Column layout of the tabular source.
    #[serde(default)]
    pub data: DataConfig,

    /// Category rules.
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,

    /// Name overrides.
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "censuslens_report.md".to_string()
}

/// Which CSV columns hold entity names and attributes.
///
/// Unset fields fall back to the census export layout of the chosen level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_column: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_column: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_marker: Option<String>,
}

impl DataConfig {
    pub fn schema(&self, level: Level) -> TableSchema {
        let mut schema = TableSchema::for_level(level);
        if let Some(ref column) = self.entity_column {
            schema.entity_column = column.clone();
        }
        if level == Level::District {
            if let Some(ref column) = self.parent_column {
                schema.parent_column = Some(column.clone());
            }
        }
        if let Some(ref marker) = self.attribute_marker {
            schema.attribute_marker = marker.clone();
        }
        schema
    }
}

/// Ordered category rules for state-level data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<CategoryRule>,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

/// Name overrides applied before exact matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Start from the built-in override table.
    #[serde(default = "default_true")]
    pub use_default_overrides: bool,

    /// Raw tabular name to boundary feature name.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            use_default_overrides: true,
            overrides: BTreeMap::new(),
        }
    }
}

impl ResolverConfig {
    /// The effective override table; configured entries win over defaults.
    pub fn table(&self) -> OverrideTable {
        let mut table = if self.use_default_overrides {
            OverrideTable::defaults()
        } else {
            OverrideTable::new()
        };
        table.extend(&OverrideTable::from_pairs(&self.overrides));
        table
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Entities listed as highest and lowest.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_ranking_threshold")]
    pub ranking_threshold: usize,

    #[serde(default = "default_ranking_head")]
    pub ranking_head: usize,

    #[serde(default = "default_ranking_tail")]
    pub ranking_tail: usize,

    #[serde(default = "default_distribution_top")]
    pub distribution_top: usize,

    /// Include the per-entity gap table.
    #[serde(default = "default_true")]
    pub include_gaps: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            ranking_threshold: default_ranking_threshold(),
            ranking_head: default_ranking_head(),
            ranking_tail: default_ranking_tail(),
            distribution_top: default_distribution_top(),
            include_gaps: true,
        }
    }
}

impl ReportConfig {
    pub fn options(&self) -> ReportOptions {
        ReportOptions {
            ranking_threshold: self.ranking_threshold,
            ranking_head: self.ranking_head,
            ranking_tail: self.ranking_tail,
            distribution_top: self.distribution_top,
            include_gaps: self.include_gaps,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_top_n() -> usize {
    5
}

fn default_ranking_threshold() -> usize {
    20
}

fn default_ranking_head() -> usize {
    15
}

fn default_ranking_tail() -> usize {
    5
}

fn default_distribution_top() -> usize {
    7
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only explicitly provided CLI values override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(top) = args.top {
            self.report.top_n = top;
        }
        if args.no_gaps {
            self.report.include_gaps = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
