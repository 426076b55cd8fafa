// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Field-bus drivers for PLC access
//!
//! This module provides the driver implementations:
//! - Modbus TCP: holding register reads through a PLC Modbus server or gateway
//! - Mock: simulated PLC for testing and commissioning without hardware

pub mod mock;
pub mod modbus_tcp;

pub use mock::{MockPlcDriver, MockPlcHandle};
pub use modbus_tcp::ModbusTcpDriver;
