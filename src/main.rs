// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point of the recipe signage daemon

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use tokio::signal;

use recipe_signage::config::{self, Config, PersistenceMode};
use recipe_signage::daemon::Daemon;
use recipe_signage::logging::init_logging;
use recipe_signage::Reconciler;

/// Keeps the signage layout of each production line in sync with the recipe
/// selected on its PLC
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML or JSON format)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Run a single reconciliation cycle, without container restart, and exit
    #[arg(long)]
    once: bool,

    /// Seconds between two cycles
    #[arg(long)]
    interval: Option<u64>,

    /// Do not restart the signage containers at startup
    #[arg(long)]
    skip_restart: bool,

    /// Where the last known recipes are kept (file or db)
    #[arg(long)]
    state_mode: Option<PersistenceMode>,

    /// Log file, rotated by size
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level_override = if args.quiet {
        Some(log::LevelFilter::Off)
    } else if args.verbose {
        Some(log::LevelFilter::Debug)
    } else {
        None
    };
    // Stderr only until the configuration provides the log file and level
    let logging = init_logging(level_override)?;

    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        return config::output_config_schema();
    }

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    // Load configuration
    let mut config = Config::from_file(&args.config)?;

    // Apply command line overrides
    config.apply_args(
        args.interval,
        args.state_mode,
        args.log_file.clone(),
        args.skip_restart || args.once,
    );

    logging.apply(&config.logging)?;

    info!(
        "recipe-signage {} starting with {} PLC(s) from {}",
        env!("CARGO_PKG_VERSION"),
        config.plcs.len(),
        args.config.display()
    );

    if args.once {
        let mut reconciler = Reconciler::from_config(&config)?;
        let report = reconciler.run_cycle().await?;
        for plc in &report.plcs {
            println!("{}: {}", plc.plc, plc.outcome);
        }
        return Ok(());
    }

    info!("Starting in daemon mode");
    let mut daemon = Daemon::new();

    // Launch all configured tasks
    daemon.launch(&config).await?;

    // Wait for termination signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, terminating daemon");
        }
        Err(err) => {
            error!("Error waiting for shutdown signal: {}", err);
        }
    }
    daemon.shutdown();
    daemon.join().await?;

    Ok(())
}
