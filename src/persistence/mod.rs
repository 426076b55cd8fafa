// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Last known recipe storage
//!
//! The daemon remembers, for every PLC, the recipe it last confirmed on the
//! signage side. Two backends are available:
//! - [`JsonFileStore`]: a `{ "plc_name": "recipe" }` JSON document
//! - [`SqliteStore`]: a `(plc_name, recipe)` table updated with upserts
//!
//! [`MemoryStore`] keeps the state in process, for tests and dry runs.

pub mod file;
pub mod memory;
pub mod sqlite;

use std::collections::HashMap;

use log::info;
use thiserror::Error;

use crate::config::{PersistenceConfig, PersistenceMode};

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Recipe of each PLC; `None` when nothing was stored yet
pub type PlcStates = HashMap<String, Option<String>>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("State file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("State file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Invalid table name '{0}'")]
    InvalidTable(String),
}

/// Storage backend for the last known recipe of each PLC
pub trait StateStore: Send {
    /// Stored recipe of one PLC
    fn load(&self, plc_name: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace the recipe of one PLC, leaving the others untouched
    fn save(&mut self, plc_name: &str, recipe: &str) -> Result<(), StoreError>;

    /// Every recipe currently stored
    fn entries(&self) -> Result<HashMap<String, String>, StoreError>;

    /// Insert or replace several recipes at once
    fn save_all(&mut self, states: &HashMap<String, String>) -> Result<(), StoreError>;

    /// State of the given PLCs only.
    ///
    /// Every name of `valid_plcs` is present in the result, mapped to `None`
    /// when nothing is stored for it. Stored entries for other names are
    /// left out.
    fn load_all(&self, valid_plcs: &[String]) -> Result<PlcStates, StoreError> {
        let mut stored = self.entries()?;
        Ok(valid_plcs
            .iter()
            .map(|name| (name.clone(), stored.remove(name)))
            .collect())
    }
}

/// Open the backend selected by the configuration
pub fn open_store(config: &PersistenceConfig) -> Result<Box<dyn StateStore>, StoreError> {
    let store: Box<dyn StateStore> = match config.mode {
        PersistenceMode::File => {
            let store = JsonFileStore::new(&config.file);
            info!("Recipe state file: {}", store.path().display());
            Box::new(store)
        }
        PersistenceMode::Db => Box::new(SqliteStore::open(&config.db.path, &config.db.table)?),
    };
    info!("Persistence initialized in mode: {:?}", config.mode);
    Ok(store)
}
