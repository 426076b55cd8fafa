// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Logging configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log file. Rotated copies are named `main001.log`, `main002.log`...
    /// When absent, logs only go to stderr.
    pub file: Option<PathBuf>,
    /// Size in bytes that triggers a rotation.
    pub max_bytes: u64,
    /// Default level filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("main.log")),
            max_bytes: 1024 * 1024,
            level: "debug".to_string(),
        }
    }
}
