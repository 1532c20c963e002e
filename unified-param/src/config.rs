use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::manager::UnifiedParameterManager;
use crate::mapping::ParameterUpdateMapping;
use crate::sync::SyncDirection;
use crate::tree::ParameterTree;
use crate::update::DEFAULT_MAX_UPDATES_PER_SECOND;
use crate::{Builder, catalog};

pub const CONFIG_FILE_ENV: &str = "UNIFIED_PARAM_CONFIG_FILE";
pub const CONFIG_OVERRIDE_ENV: &str = "UNIFIED_PARAM_CONFIG_OVERRIDE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    pub optimization_enabled: bool,
    pub max_updates_per_second: u32,
    pub debug_mode: bool,
    pub default_sync_direction: SyncDirection,
    pub register_default_catalog: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            optimization_enabled: true,
            max_updates_per_second: DEFAULT_MAX_UPDATES_PER_SECOND,
            debug_mode: false,
            default_sync_direction: SyncDirection::default(),
            register_default_catalog: true,
        }
    }
}

impl ManagerConfig {
    /// Load from a JSON file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Custom(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply `key = value` overrides, where keys are `/`-separated paths
    /// into the JSON form of the config.
    pub fn with_overrides(self, overrides: &[(String, serde_json::Value)]) -> Result<Self> {
        if overrides.is_empty() {
            return Ok(self);
        }
        let mut doc = serde_json::to_value(&self)?;
        for (key, value) in overrides {
            insert_json(&mut doc, key, value.clone())?;
        }
        Ok(serde_json::from_value(doc)?)
    }
}

fn insert_json(doc: &mut serde_json::Value, key: &str, value: serde_json::Value) -> Result<()> {
    let mut segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
    let last = segments
        .pop()
        .ok_or_else(|| Error::Custom(format!("Empty config override key '{}'", key)))?;
    let mut current = doc;
    for segment in segments {
        current = current
            .as_object_mut()
            .ok_or_else(|| Error::Custom(format!("Config key '{}' is not an object", key)))?
            .entry(segment)
            .or_insert_with(|| json!({}));
    }
    current
        .as_object_mut()
        .ok_or_else(|| Error::Custom(format!("Config key '{}' is not an object", key)))?
        .insert(last.to_string(), value);
    Ok(())
}

#[derive(Default)]
pub struct UnifiedParameterManagerBuilder {
    config_file: Option<PathBuf>,
    config_overrides: Vec<(String, serde_json::Value)>,
    overrides_file: Option<PathBuf>,
    tree: Option<Arc<ParameterTree>>,
    mapping: Option<ParameterUpdateMapping>,
}

impl UnifiedParameterManagerBuilder {
    /// Load configuration from a JSON file
    pub fn with_config_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Add a JSON configuration override
    ///
    /// # Example
    /// ```
    /// use serde_json::json;
    /// use unified_param::{Builder, UnifiedParameterManagerBuilder};
    ///
    /// let manager = UnifiedParameterManagerBuilder::default()
    ///     .with_json("max_updates_per_second", json!(30))
    ///     .with_json("default_sync_direction/system_to_tree", json!(true))
    ///     .build()?;
    /// # Ok::<(), unified_param::Error>(())
    /// ```
    pub fn with_json<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.config_overrides.push((key.into(), value));
        self
    }

    pub fn with_optimization(self, enabled: bool) -> Self {
        self.with_json("optimization_enabled", json!(enabled))
    }

    pub fn with_max_updates_per_second(self, max: u32) -> Self {
        self.with_json("max_updates_per_second", json!(max))
    }

    pub fn with_debug_mode(self, enabled: bool) -> Self {
        self.with_json("debug_mode", json!(enabled))
    }

    pub fn with_sync_direction(self, direction: SyncDirection) -> Self {
        self.with_json("default_sync_direction", json!(direction))
    }

    /// Skip registering the built-in parameter catalog.
    pub fn without_default_catalog(self) -> Self {
        self.with_json("register_default_catalog", json!(false))
    }

    /// Apply a YAML parameter override file after the catalog is registered.
    pub fn with_overrides_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.overrides_file = Some(path.into());
        self
    }

    /// Share an existing tree instead of creating a fresh one.
    pub fn with_tree(mut self, tree: Arc<ParameterTree>) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn with_mapping(mut self, mapping: ParameterUpdateMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Parse and apply overrides from environment variable
    ///
    /// Expected format: `key1=value1;key2=value2`
    /// Values should be valid JSON
    ///
    /// # Example
    /// ```text
    /// export UNIFIED_PARAM_CONFIG_OVERRIDE='debug_mode=true;max_updates_per_second=120'
    /// ```
    fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(overrides_str) = std::env::var(CONFIG_OVERRIDE_ENV) {
            tracing::debug!(
                "[PARAMS] Applying config overrides from {}: {}",
                CONFIG_OVERRIDE_ENV,
                overrides_str
            );

            for pair in overrides_str.split(';') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }

                let Some((key, value)) = pair.split_once('=') else {
                    return Err(Error::Custom(format!(
                        "Invalid {} format: '{}'. Expected 'key=value'",
                        CONFIG_OVERRIDE_ENV, pair
                    )));
                };
                let (key, value) = (key.trim(), value.trim());
                let json_value = serde_json::from_str::<serde_json::Value>(value).map_err(|e| {
                    Error::Custom(format!(
                        "Failed to parse {} value for key '{}': {} (value: {})",
                        CONFIG_OVERRIDE_ENV, key, e, value
                    ))
                })?;
                tracing::debug!("[PARAMS] Override: {} = {}", key, json_value);
                self.config_overrides.push((key.to_string(), json_value));
            }
        }
        Ok(self)
    }

    /// Resolve the effective configuration without building a manager.
    ///
    /// Priority order:
    /// 1. Config file passed via `with_config_file()`
    /// 2. `UNIFIED_PARAM_CONFIG_FILE` environment variable
    /// 3. Default config
    ///
    /// Overrides from the environment and `with_json()` are applied on top.
    pub fn resolve_config(self) -> Result<(ManagerConfig, Self)> {
        let config = if let Some(ref config_file) = self.config_file {
            ManagerConfig::from_file(config_file)?
        } else if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            ManagerConfig::from_file(path)?
        } else {
            ManagerConfig::default()
        };

        let mut this = self.apply_env_overrides()?;
        let overrides = std::mem::take(&mut this.config_overrides);
        let config = config.with_overrides(&overrides)?;
        Ok((config, this))
    }
}

impl Builder for UnifiedParameterManagerBuilder {
    type Output = UnifiedParameterManager;

    fn build(self) -> Result<UnifiedParameterManager> {
        let (config, this) = self.resolve_config()?;
        tracing::debug!("[PARAMS] Effective config: {:?}", config);

        let tree = this.tree.unwrap_or_default();
        if config.register_default_catalog {
            catalog::register_defaults(&tree)?;
        }

        let manager =
            UnifiedParameterManager::with_parts(tree, this.mapping.unwrap_or_default(), &config);

        if let Some(path) = this.overrides_file {
            manager.apply_overrides_file(&path)?;
        }
        Ok(manager)
    }
}
