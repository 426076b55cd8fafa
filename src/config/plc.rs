// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PLC endpoint configuration
//!
//! Each entry describes one production line: where its PLC lives, which byte
//! region holds the selected recipe, and which display group shows the
//! matching layout.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

/// Field-bus driver used to reach a PLC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlcDriverType {
    /// Modbus TCP client reading holding registers
    ModbusTcp,
    /// Simulated PLC returning `mock_recipe`
    Mock,
}

impl Default for PlcDriverType {
    fn default() -> Self {
        PlcDriverType::ModbusTcp
    }
}

/// How the recipe bytes are laid out in the PLC memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeEncoding {
    /// S7 `STRING[n]`: max length byte, actual length byte, then characters
    S7String,
    /// Plain characters terminated by the first NUL byte
    Raw,
}

impl Default for RecipeEncoding {
    fn default() -> Self {
        RecipeEncoding::S7String
    }
}

impl FromStr for RecipeEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s7_string" | "s7" => Ok(RecipeEncoding::S7String),
            "raw" => Ok(RecipeEncoding::Raw),
            other => Err(format!(
                "unknown recipe encoding '{}', expected s7_string or raw",
                other
            )),
        }
    }
}

/// Configuration of a single PLC.
///
/// # Example
///
/// ```
/// use recipe_signage::config::PlcConfig;
///
/// let plc = PlcConfig {
///     name: "line1".to_string(),
///     display_group: "Line 1 screens".to_string(),
///     address: "192.168.0.10".to_string(),
///     ..PlcConfig::default()
/// };
/// assert_eq!(plc.port, 502);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlcConfig {
    /// Unique identifier, also the key of the persisted state.
    pub name: String,

    /// Name of the Xibo display group driven by this PLC.
    ///
    /// Doubles as the first tag a layout must carry to be selected.
    pub display_group: String,

    /// Host name or IP address of the PLC.
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Modbus unit identifier.
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// First holding register of the recipe region.
    #[serde(default)]
    pub start_register: u16,

    /// Length of the recipe region in bytes.
    #[serde(default = "default_length")]
    pub length: u16,

    #[serde(default)]
    pub encoding: RecipeEncoding,

    /// Upper bound for connect and read, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub driver: PlcDriverType,

    /// Recipe reported by the `mock` driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_recipe: Option<String>,
}

fn default_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

fn default_length() -> u16 {
    32
}

fn default_timeout_ms() -> u64 {
    3000
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            name: "plc1".to_string(),
            display_group: "Pantallas Linea 1".to_string(),
            address: "127.0.0.1".to_string(),
            port: default_port(),
            unit_id: default_unit_id(),
            start_register: 0,
            length: default_length(),
            encoding: RecipeEncoding::default(),
            timeout_ms: default_timeout_ms(),
            driver: PlcDriverType::default(),
            mock_recipe: None,
        }
    }
}

/// Load an array of PLC definitions from a JSON file.
pub fn load_plcs_file<P: AsRef<Path>>(path: P) -> Result<Vec<PlcConfig>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read PLC list at {:?}", path))?;
    let plcs: Vec<PlcConfig> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse PLC list at {:?}", path))?;
    info!("{} PLCs loaded from {}", plcs.len(), path.display());
    Ok(plcs)
}
