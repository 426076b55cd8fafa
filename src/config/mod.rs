// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the recipe signage daemon
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML (or JSON)
//! file and validated against a JSON schema before being deserialized.
//!
//! ## Configuration Structure
//!
//! - `daemon`: poll interval and change detection settings
//! - `plcs`: the PLC endpoints to poll, optionally extended by `plcs_file`
//! - `persistence`: where the last known recipe of each PLC is kept
//! - `signage`: Xibo CMS endpoint and client credentials
//! - `logging`: log file and rotation
//! - `restart`: optional container restart before the first poll
//!
//! ## Usage
//!
//! ```no_run
//! use recipe_signage::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(Some(30), None, None, true);
//!
//! println!("Polling {} PLCs", config.plcs.len());
//! ```

pub mod daemon;
pub mod logging;
pub mod persistence;
pub mod plc;
pub mod restart;
pub mod signage;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use daemon::DaemonConfig;
pub use logging::LoggingConfig;
pub use persistence::{DbConfig, PersistenceConfig, PersistenceMode};
pub use plc::{PlcConfig, PlcDriverType, RecipeEncoding};
pub use restart::RestartConfig;
pub use signage::SignageConfig;
pub use utils::{output_config_schema, validate_specific_rules};

const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure for the recipe signage daemon.
///
/// Every section falls back to its defaults when omitted, so a minimal file
/// only needs the PLC list and the signage credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Poll loop settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// PLCs polled on every cycle, in this order.
    #[serde(default)]
    pub plcs: Vec<PlcConfig>,

    /// Optional JSON file holding additional PLC definitions.
    ///
    /// Relative paths are resolved against the directory of the
    /// configuration file. Its entries are appended to `plcs` on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plcs_file: Option<PathBuf>,

    /// Last known recipe storage.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Xibo CMS connection settings.
    #[serde(default)]
    pub signage: SignageConfig,

    /// Log output and rotation.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Container restart performed once before polling starts.
    #[serde(default)]
    pub restart: RestartConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Parse a configuration document into a generic JSON value.
    ///
    /// `.json` files are read as JSON, everything else as YAML.
    fn parse_document(path: &Path, contents: &str) -> Result<serde_json::Value> {
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str(contents)
                .with_context(|| format!("Failed to parse JSON configuration from {:?}", path))
        } else {
            let yaml_value: serde_yml::Value = serde_yml::from_str(contents)
                .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;
            serde_json::to_value(&yaml_value).with_context(|| {
                format!("Failed to convert YAML to JSON for validation: {:?}", path)
            })
        }
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let json_value = Self::parse_document(path, &contents)?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let mut config: Config = match serde_json::from_value(json_value) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Some(plcs_file) = config.plcs_file.clone() {
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            let extra = plc::load_plcs_file(base_dir.join(plcs_file))?;
            config.plcs.extend(extra);
        }

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only explicitly provided values override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `interval_seconds` - Poll interval
    /// * `state_mode` - Persistence backend
    /// * `log_file` - Log file base name
    /// * `skip_restart` - If true, disables the container restart
    pub fn apply_args(
        &mut self,
        interval_seconds: Option<u64>,
        state_mode: Option<PersistenceMode>,
        log_file: Option<PathBuf>,
        skip_restart: bool,
    ) {
        if let Some(interval) = interval_seconds {
            debug!("Overriding poll interval from command line: {}", interval);
            self.daemon.interval_seconds = interval;
        }

        if let Some(mode) = state_mode {
            debug!("Overriding persistence mode from command line: {:?}", mode);
            self.persistence.mode = mode;
        }

        if let Some(file) = log_file {
            debug!("Overriding log file from command line: {:?}", file);
            self.logging.file = Some(file);
        }

        if skip_restart {
            debug!("Container restart disabled from command line");
            self.restart.enabled = false;
        }
    }
}
