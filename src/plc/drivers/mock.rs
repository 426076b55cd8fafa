// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Mock PLC driver
//!
//! Simulates a PLC holding a recipe string. The state lives behind a
//! [`MockPlcHandle`] so tests (or a commissioning session) can change the
//! recipe, take the PLC offline, or inject corrupt bytes while a reader owns
//! the driver.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::debug;

use crate::config::RecipeEncoding;
use crate::plc::codec;
use crate::plc::{PlcDriver, PlcError};

#[derive(Debug, Default)]
struct MockState {
    recipe: Mutex<String>,
    raw_bytes: Mutex<Option<Vec<u8>>>,
    offline: AtomicBool,
    connected: AtomicBool,
    reads: AtomicUsize,
}

/// Shared control handle over a [`MockPlcDriver`]
#[derive(Debug, Clone)]
pub struct MockPlcHandle {
    state: Arc<MockState>,
}

impl MockPlcHandle {
    pub fn set_recipe(&self, recipe: impl Into<String>) {
        if let Ok(mut current) = self.state.recipe.lock() {
            *current = recipe.into();
        }
    }

    /// Serve these bytes verbatim instead of the encoded recipe
    pub fn set_raw_bytes(&self, bytes: Option<Vec<u8>>) {
        if let Ok(mut raw) = self.state.raw_bytes.lock() {
            *raw = bytes;
        }
    }

    /// An offline PLC refuses connections
    pub fn set_online(&self, online: bool) {
        self.state.offline.store(!online, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    /// Number of successful area reads so far
    pub fn reads(&self) -> usize {
        self.state.reads.load(Ordering::SeqCst)
    }
}

/// Simulated PLC
#[derive(Debug)]
pub struct MockPlcDriver {
    encoding: RecipeEncoding,
    state: Arc<MockState>,
}

impl MockPlcDriver {
    pub fn new(recipe: impl Into<String>, encoding: RecipeEncoding) -> Self {
        let state = MockState {
            recipe: Mutex::new(recipe.into()),
            ..MockState::default()
        };
        Self {
            encoding,
            state: Arc::new(state),
        }
    }

    pub fn handle(&self) -> MockPlcHandle {
        MockPlcHandle {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl PlcDriver for MockPlcDriver {
    async fn connect(&mut self) -> Result<(), PlcError> {
        if self.state.offline.load(Ordering::SeqCst) {
            return Err(PlcError::Connection("mock PLC is offline".to_string()));
        }
        self.state.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn read_area(&mut self, start_register: u16, length: u16) -> Result<Vec<u8>, PlcError> {
        if !self.state.connected.load(Ordering::SeqCst) {
            return Err(PlcError::NotConnected);
        }
        debug!(
            "Mock PLC read of {} bytes at register {}",
            length, start_register
        );

        let raw = self
            .state
            .raw_bytes
            .lock()
            .map_err(|e| PlcError::Read(format!("mock state poisoned: {}", e)))?
            .clone();
        let bytes = match raw {
            Some(mut bytes) => {
                bytes.resize(length as usize, 0);
                bytes
            }
            None => {
                let recipe = self
                    .state
                    .recipe
                    .lock()
                    .map_err(|e| PlcError::Read(format!("mock state poisoned: {}", e)))?;
                codec::encode(&recipe, self.encoding, length as usize)
            }
        };
        self.state.reads.fetch_add(1, Ordering::SeqCst);
        Ok(bytes)
    }

    async fn disconnect(&mut self) {
        self.state.connected.store(false, Ordering::SeqCst);
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }
}
