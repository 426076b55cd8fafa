// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! State persistence configuration

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Backend used to store the last known recipe of each PLC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    /// Pretty-printed JSON object on disk
    File,
    /// SQLite table updated with upserts
    Db,
}

impl Default for PersistenceMode {
    fn default() -> Self {
        PersistenceMode::File
    }
}

impl FromStr for PersistenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(PersistenceMode::File),
            "db" => Ok(PersistenceMode::Db),
            other => Err(format!("unknown persistence mode '{}', expected file or db", other)),
        }
    }
}

/// Relational backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// Table holding `(plc_name, recipe)` rows.
    pub table: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("plc_state.db"),
            table: "plc_state".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub mode: PersistenceMode,
    /// State file used in `file` mode.
    pub file: PathBuf,
    pub db: DbConfig,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            mode: PersistenceMode::default(),
            file: PathBuf::from("plcs_state.json"),
            db: DbConfig::default(),
        }
    }
}
