// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JSON file state store
//!
//! The state is a flat JSON object keyed by PLC name. `null` values, written
//! by older deployments for PLCs never read, are accepted and ignored.
//! Every write replaces the whole document through a temporary file in the
//! same directory, so a crash never leaves a truncated state behind.
//!
//! A file that is not valid JSON fails reads, but a write moves it aside to
//! `<name>.corrupt` and starts a fresh document, so the service recovers on
//! its next successful cycle.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::NamedTempFile;

use super::{StateStore, StoreError};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<HashMap<String, String>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let raw: HashMap<String, Option<String>> = serde_json::from_str(&contents)?;
        Ok(raw
            .into_iter()
            .filter_map(|(name, recipe)| recipe.map(|r| (name, r)))
            .collect())
    }

    /// Current states as the base of a write; a corrupt file is moved aside
    fn read_for_update(&self) -> Result<HashMap<String, String>, StoreError> {
        match self.read() {
            Err(StoreError::Json(e)) => {
                let backup = self.corrupt_path();
                warn!(
                    "State file {} is corrupt ({}), moving it to {} and starting over",
                    self.path.display(),
                    e,
                    backup.display()
                );
                if let Err(e) = fs::rename(&self.path, &backup) {
                    warn!("Could not move corrupt state file aside: {}", e);
                }
                Ok(HashMap::new())
            }
            other => other,
        }
    }

    fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn write(&self, states: &HashMap<String, String>) -> Result<(), StoreError> {
        let ordered: BTreeMap<&String, &String> = states.iter().collect();
        let json = serde_json::to_string_pretty(&ordered)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        debug!("State written to {}", self.path.display());
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, plc_name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read()?.remove(plc_name))
    }

    fn save(&mut self, plc_name: &str, recipe: &str) -> Result<(), StoreError> {
        let mut states = self.read_for_update()?;
        states.insert(plc_name.to_string(), recipe.to_string());
        self.write(&states)
    }

    fn entries(&self) -> Result<HashMap<String, String>, StoreError> {
        self.read()
    }

    fn save_all(&mut self, states: &HashMap<String, String>) -> Result<(), StoreError> {
        let mut current = self.read_for_update()?;
        current.extend(states.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.write(&current)
    }
}
