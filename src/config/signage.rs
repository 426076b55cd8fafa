// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Xibo CMS connection configuration

use serde::{Deserialize, Serialize};

/// Settings for the signage REST API.
///
/// The client authenticates with the OAuth2 client-credentials grant, so an
/// application with that grant must exist in the CMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignageConfig {
    /// CMS root URL, without the `/api` suffix.
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Length of the scheduled events, counted from their creation.
    pub event_duration_days: i64,
    /// Create events as priority events.
    pub priority: bool,
}

impl Default for SignageConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_seconds: 10,
            event_duration_days: 365,
            priority: false,
        }
    }
}
