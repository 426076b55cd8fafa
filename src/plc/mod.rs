// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PLC access
//!
//! This module reads the recipe currently selected on a PLC:
//! - a [`PlcDriver`] moves bytes over the field bus (Modbus TCP or mock)
//! - the [`codec`] turns the byte region into a recipe token
//! - a [`PlcReader`] ties both together for one configured PLC
//!
//! Every read opens its own connection and closes it afterwards, so a PLC
//! that reboots between two polls needs no reconnection logic.

pub mod codec;
pub mod drivers;

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;

use crate::config::{PlcConfig, PlcDriverType, RecipeEncoding};

/// Errors raised while reading a PLC
#[derive(Error, Debug)]
pub enum PlcError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Read failed: {0}")]
    Read(String),
    #[error("Timed out after {0} ms")]
    Timeout(u64),
    #[error("Not connected")]
    NotConnected,
    #[error("Invalid recipe data: {0}")]
    Decode(String),
}

/// Field-bus driver abstraction
#[async_trait]
pub trait PlcDriver: Send {
    /// Open the connection to the device
    async fn connect(&mut self) -> Result<(), PlcError>;

    /// Read `length` bytes starting at holding register `start_register`
    async fn read_area(&mut self, start_register: u16, length: u16) -> Result<Vec<u8>, PlcError>;

    /// Close the connection. Never fails; problems are only logged.
    async fn disconnect(&mut self);

    /// Endpoint description used in log messages
    fn endpoint(&self) -> String;
}

/// Create the driver selected by the PLC configuration
pub fn create_driver(config: &PlcConfig) -> Box<dyn PlcDriver> {
    match config.driver {
        PlcDriverType::ModbusTcp => Box::new(drivers::ModbusTcpDriver::from_config(config)),
        PlcDriverType::Mock => Box::new(drivers::MockPlcDriver::new(
            config.mock_recipe.clone().unwrap_or_default(),
            config.encoding,
        )),
    }
}

/// Reads the recipe token of one PLC
pub struct PlcReader {
    name: String,
    display_group: String,
    start_register: u16,
    length: u16,
    encoding: RecipeEncoding,
    driver: Box<dyn PlcDriver>,
}

impl PlcReader {
    pub fn new(config: &PlcConfig, driver: Box<dyn PlcDriver>) -> Self {
        Self {
            name: config.name.clone(),
            display_group: config.display_group.clone(),
            start_register: config.start_register,
            length: config.length,
            encoding: config.encoding,
            driver,
        }
    }

    /// Build a reader with the driver selected by the configuration
    pub fn from_config(config: &PlcConfig) -> Self {
        Self::new(config, create_driver(config))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_group(&self) -> &str {
        &self.display_group
    }

    /// Read and decode the current recipe.
    ///
    /// Returns `Ok(None)` when the PLC holds an empty recipe. The connection
    /// is closed whatever the outcome of the read.
    pub async fn read_recipe(&mut self) -> Result<Option<String>, PlcError> {
        let endpoint = self.driver.endpoint();
        debug!("Connecting to PLC {} at {}", self.name, endpoint);
        self.driver.connect().await.map_err(|e| {
            warn!("Could not connect to PLC {} at {}: {}", self.name, endpoint, e);
            e
        })?;

        let result = match self.driver.read_area(self.start_register, self.length).await {
            Ok(bytes) => codec::decode(&bytes, self.encoding),
            Err(e) => Err(e),
        };
        self.driver.disconnect().await;

        let raw = result.map_err(|e| {
            warn!("Error reading recipe from {}: {}", endpoint, e);
            e
        })?;
        let recipe = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if recipe.is_empty() {
            debug!("PLC {} holds an empty recipe", self.name);
            return Ok(None);
        }
        info!("Recipe read from {}: {}", endpoint, recipe);
        Ok(Some(recipe.to_string()))
    }
}
