// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use std::collections::HashSet;

use anyhow::{Context, Result};
use log::debug;

use super::{Config, PlcDriverType, RecipeEncoding, CONFIG_SCHEMA};

/// Largest recipe region readable in a single Modbus request (123 registers).
pub const MAX_RECIPE_BYTES: u16 = 246;

/// Longest layout event the service schedules, in days (about a century).
pub const MAX_EVENT_DURATION_DAYS: i64 = 36_500;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./recipe_signage --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **PLC names**: non-empty and unique, since they key the persisted state
/// - **Recipe region**: at least the two header bytes for `s7_string`, at most
///   [`MAX_RECIPE_BYTES`]
/// - **Mock driver**: must carry a `mock_recipe`
/// - **Poll interval**: at least one second
/// - **Signage URL**: must start with `http://` or `https://`
/// - **Event duration**: between 1 and [`MAX_EVENT_DURATION_DAYS`] days
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.daemon.interval_seconds == 0 {
        anyhow::bail!("Poll interval must be at least 1 second");
    }

    let base_url = &config.signage.base_url;
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        anyhow::bail!(
            "Invalid signage base_url '{}': must start with http:// or https://",
            base_url
        );
    }
    url::Url::parse(base_url).with_context(|| format!("Invalid signage base_url '{}'", base_url))?;

    let duration = config.signage.event_duration_days;
    if !(1..=MAX_EVENT_DURATION_DAYS).contains(&duration) {
        anyhow::bail!(
            "Event duration of {} days outside 1..={}",
            duration,
            MAX_EVENT_DURATION_DAYS
        );
    }

    let mut seen = HashSet::new();
    for plc in &config.plcs {
        if plc.name.trim().is_empty() {
            anyhow::bail!("PLC name must not be empty");
        }
        if !seen.insert(plc.name.as_str()) {
            anyhow::bail!("Duplicate PLC name: {}", plc.name);
        }
        if plc.display_group.trim().is_empty() {
            anyhow::bail!("PLC {} has no display group", plc.name);
        }
        if plc.length == 0 || plc.length > MAX_RECIPE_BYTES {
            anyhow::bail!(
                "PLC {}: recipe length {} outside 1..={}",
                plc.name,
                plc.length,
                MAX_RECIPE_BYTES
            );
        }
        if plc.encoding == RecipeEncoding::S7String && plc.length < 2 {
            anyhow::bail!(
                "PLC {}: an S7 string needs at least 2 bytes, got {}",
                plc.name,
                plc.length
            );
        }
        if plc.driver == PlcDriverType::Mock && plc.mock_recipe.is_none() {
            anyhow::bail!("PLC {} uses the mock driver without mock_recipe", plc.name);
        }
    }

    Ok(())
}
