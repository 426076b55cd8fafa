// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Container restart configuration

use serde::{Deserialize, Serialize};

/// Command run once at startup to restart the signage containers.
///
/// On a Windows host running the CMS inside WSL, set `program` to `wsl` and
/// prepend `docker-compose` to `args`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartConfig {
    pub enabled: bool,
    pub program: String,
    pub args: Vec<String>,
    /// Seconds to wait for the containers to come back up.
    pub wait_seconds: u64,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: "docker-compose".to_string(),
            args: vec![
                "-f".to_string(),
                "/opt/xibo/docker-compose.yml".to_string(),
                "restart".to_string(),
            ],
            wait_seconds: 30,
        }
    }
}
