// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Commissioning helper: read the recipe of one PLC and print it

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use std::path::PathBuf;

use recipe_signage::config::{Config, PlcConfig, RecipeEncoding};
use recipe_signage::plc::PlcReader;

/// Read the recipe currently selected on a PLC
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Read the PLC with this name from the configuration file
    #[clap(long)]
    plc: Option<String>,

    /// Configuration file used with --plc
    #[clap(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Modbus server address (ad-hoc mode)
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[clap(long, default_value = "502")]
    port: u16,

    /// Modbus unit identifier
    #[clap(long, default_value = "1")]
    unit_id: u8,

    /// First holding register of the recipe area
    #[clap(long, default_value = "0")]
    start_register: u16,

    /// Size of the recipe area in bytes
    #[clap(long, default_value = "32")]
    length: u16,

    /// Recipe layout: s7_string or raw
    #[clap(long, default_value = "s7_string")]
    encoding: RecipeEncoding,

    /// Timeout in milliseconds
    #[clap(long, default_value = "3000")]
    timeout_ms: u64,
}

fn plc_from_args(args: &Args) -> Result<PlcConfig> {
    if let Some(name) = &args.plc {
        if !args.config.exists() {
            bail!("Configuration file does not exist: {}", args.config.display());
        }
        let config = Config::from_file(&args.config)?;
        return config
            .plcs
            .into_iter()
            .find(|plc| &plc.name == name)
            .ok_or_else(|| anyhow!("No PLC named '{}' in {}", name, args.config.display()));
    }

    Ok(PlcConfig {
        name: "probe".to_string(),
        display_group: "-".to_string(),
        address: args.address.clone(),
        port: args.port,
        unit_id: args.unit_id,
        start_register: args.start_register,
        length: args.length,
        encoding: args.encoding,
        timeout_ms: args.timeout_ms,
        ..PlcConfig::default()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();
    let plc = plc_from_args(&args)?;
    println!(
        "Reading {} bytes at register {} of {}:{} (unit {})",
        plc.length, plc.start_register, plc.address, plc.port, plc.unit_id
    );

    let mut reader = PlcReader::from_config(&plc);
    match reader.read_recipe().await? {
        Some(recipe) => println!("Recipe: {}", recipe),
        None => println!("The PLC holds an empty recipe"),
    }

    Ok(())
}
