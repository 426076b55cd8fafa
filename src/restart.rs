// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Signage container restart
//!
//! The CMS containers are restarted once when the daemon starts so the
//! players pick up a clean schedule.

use anyhow::{bail, Context, Result};
use log::{error, info};
use tokio::process::Command;

use crate::config::RestartConfig;

/// Run the configured restart command and wait for it to exit
pub async fn restart_containers(config: &RestartConfig) -> Result<()> {
    info!(
        "Restarting signage containers: {} {}",
        config.program,
        config.args.join(" ")
    );

    let output = Command::new(&config.program)
        .args(&config.args)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("Failed to run {}", config.program))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        info!("Restart output: {}", stdout.trim());
        Ok(())
    } else {
        error!("Error restarting containers: {}", stderr.trim());
        bail!("{} exited with {}", config.program, output.status)
    }
}
