// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll loop configuration

use serde::{Deserialize, Serialize};

/// Settings of the polling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Seconds to wait between two reconciliation cycles.
    pub interval_seconds: u64,

    /// Keep checking the signage schedule when the recipe did not change.
    ///
    /// When enabled an event that was removed from the CMS by hand is
    /// recreated on the next cycle. When disabled an unchanged recipe costs
    /// no API call at all.
    pub verify_unchanged: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            verify_unchanged: true,
        }
    }
}
