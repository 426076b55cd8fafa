// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP driver
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The PLC (or its gateway) is the server
//! exposing the recipe data block as holding registers; this driver is the client.
//!
//! On Siemens controllers the data block is typically published with the
//! `MB_SERVER` instruction, which maps each register to two consecutive DB bytes,
//! high byte first.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::time::timeout;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

use crate::config::PlcConfig;
use crate::plc::codec::registers_to_bytes;
use crate::plc::{PlcDriver, PlcError};

/// Modbus TCP client reading the recipe region from holding registers
pub struct ModbusTcpDriver {
    address: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
    ctx: Option<Context>,
}

impl ModbusTcpDriver {
    pub fn new(address: impl Into<String>, port: u16, unit_id: u8, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            port,
            unit_id,
            timeout,
            ctx: None,
        }
    }

    pub fn from_config(config: &PlcConfig) -> Self {
        Self::new(
            config.address.clone(),
            config.port,
            config.unit_id,
            Duration::from_millis(config.timeout_ms),
        )
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Resolve the configured host, accepting both IP addresses and host names
    async fn resolve(address: &str, port: u16) -> Result<SocketAddr, PlcError> {
        let mut addrs = tokio::net::lookup_host((address, port))
            .await
            .map_err(|e| PlcError::Connection(format!("cannot resolve {}: {}", address, e)))?;
        addrs
            .next()
            .ok_or_else(|| PlcError::Connection(format!("no address found for {}", address)))
    }
}

#[async_trait]
impl PlcDriver for ModbusTcpDriver {
    async fn connect(&mut self) -> Result<(), PlcError> {
        let socket_addr = timeout(self.timeout, Self::resolve(&self.address, self.port))
            .await
            .map_err(|_| PlcError::Timeout(self.timeout_ms()))??;

        let ctx = timeout(self.timeout, tcp::connect_slave(socket_addr, Slave(self.unit_id)))
            .await
            .map_err(|_| PlcError::Timeout(self.timeout_ms()))?
            .map_err(|e| PlcError::Connection(format!("{}: {}", socket_addr, e)))?;

        debug!("Modbus connection established with {}", socket_addr);
        self.ctx = Some(ctx);
        Ok(())
    }

    async fn read_area(&mut self, start_register: u16, length: u16) -> Result<Vec<u8>, PlcError> {
        let timeout_ms = self.timeout_ms();
        let limit = self.timeout;
        let ctx = self.ctx.as_mut().ok_or(PlcError::NotConnected)?;

        let quantity = length.div_ceil(2);
        debug!(
            "Reading {} holding registers starting at address {}",
            quantity, start_register
        );
        let registers = match timeout(limit, ctx.read_holding_registers(start_register, quantity))
            .await
            .map_err(|_| PlcError::Timeout(timeout_ms))?
        {
            Ok(Ok(registers)) => registers,
            Ok(Err(exception)) => {
                return Err(PlcError::Read(format!("Modbus exception {:?}", exception)))
            }
            Err(e) => return Err(PlcError::Read(e.to_string())),
        };

        let mut bytes = registers_to_bytes(&registers);
        bytes.truncate(length as usize);
        Ok(bytes)
    }

    async fn disconnect(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            if let Err(e) = ctx.disconnect().await {
                debug!("Error while closing Modbus connection to {}: {}", self.endpoint(), e);
            }
        }
    }

    fn endpoint(&self) -> String {
        format!("{}:{} (unit {})", self.address, self.port, self.unit_id)
    }
}
