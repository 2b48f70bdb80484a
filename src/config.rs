//! Site configuration module.
//!
//! Handles loading, validating, and merging the optional `tomlsite.toml` file
//! in the build root. Stock defaults are overridden by whatever the file
//! specifies; the file itself is never treated as a document.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [build]
//! index_name = "index.toml"   # File name of index documents
//! plugins = ["finder", "loader", "indexer", "writer"]
//!
//! [render]
//! tag_mode = "pair"           # Base tag mode: open, pair or void
//! attrib_separator = " "      # Joins rendered attributes
//!
//! [merge]
//! list_order = "inherited_first"  # or "local_first"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::cascade::{TAG_MODE, TagMode};
use crate::merge::ListOrder;
use crate::node::{Node, Value};

/// File name of the site configuration, looked up in the build root.
pub const CONFIG_FILE: &str = "tomlsite.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `tomlsite.toml`.
///
/// User config files need only specify the values they want to override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Discovery and plugin selection.
    pub build: BuildConfig,
    /// Base scope of the rendering cascade.
    pub render: RenderConfig,
    /// Template composition policy.
    pub merge: MergeConfig,
}

impl SiteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.plugins.is_empty() {
            return Err(ConfigError::Validation(
                "build.plugins must not be empty".into(),
            ));
        }
        let index = Path::new(&self.build.index_name);
        if index.extension().is_none_or(|ext| ext != "toml")
            || index.components().count() != 1
        {
            return Err(ConfigError::Validation(format!(
                "build.index_name must be a .toml file name, got {:?}",
                self.build.index_name
            )));
        }
        if self.render.attrib_separator.is_empty() {
            return Err(ConfigError::Validation(
                "render.attrib_separator must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Documents with this file name supply defaults to their directory.
    pub index_name: String,
    /// Plugins to run, in order.
    pub plugins: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            index_name: "index.toml".to_string(),
            plugins: ["finder", "loader", "indexer", "writer"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub tag_mode: TagMode,
    pub attrib_separator: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tag_mode: TagMode::default(),
            attrib_separator: " ".to_string(),
        }
    }
}

impl RenderConfig {
    /// Options every document starts from before its own `config` scopes.
    pub fn base_scope(&self) -> Node {
        let mut base = Node::new();
        base.insert(
            TAG_MODE.to_string(),
            Value::String(self.tag_mode.as_str().to_string()),
        );
        base
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Which side of a list merge comes first.
    pub list_order: ListOrder,
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; anything else in `overlay` replaces the base
/// value. Lists are replaced, not concatenated.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.get_mut(&key) {
                    Some(base_val) => {
                        let base_val = std::mem::replace(base_val, toml::Value::Boolean(false));
                        merge_toml(base_val, overlay_val)
                    }
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `tomlsite.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `tomlsite.toml` in the given directory.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `tomlsite.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# tomlsite configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as tomlsite.toml in the build root.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Build
# ---------------------------------------------------------------------------
[build]
# Documents with this file name supply `base` defaults to every document
# in their directory and below.
index_name = "index.toml"

# Plugins to run, in order. Unknown names are skipped with a warning.
plugins = ["finder", "loader", "indexer", "writer"]

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# Tag mode for every node that does not set its own:
#   open -> <tag>          pair -> <tag>...</tag>          void -> <tag />
tag_mode = "pair"

# Placed between rendered attributes.
attrib_separator = " "

# ---------------------------------------------------------------------------
# Template composition
# ---------------------------------------------------------------------------
[merge]
# Order of list items when a document extends a list its index defines:
#   inherited_first -> index items, then document items
#   local_first     -> document items, then index items
list_order = "inherited_first"
"##
}
