// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-process state store

use std::collections::HashMap;

use super::{StateStore, StoreError};

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    states: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, plc_name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.states.get(plc_name).cloned())
    }

    fn save(&mut self, plc_name: &str, recipe: &str) -> Result<(), StoreError> {
        self.states.insert(plc_name.to_string(), recipe.to_string());
        Ok(())
    }

    fn entries(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.states.clone())
    }

    fn save_all(&mut self, states: &HashMap<String, String>) -> Result<(), StoreError> {
        self.states.extend(states.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}
