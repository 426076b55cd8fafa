// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! SQLite state store
//!
//! Rows are `(plc_name PRIMARY KEY, recipe)`; writes are upserts so the
//! table never holds two rows for the same PLC.

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use super::{StateStore, StoreError};

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    table: String,
}

fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the table exists
    pub fn open<P: AsRef<Path>>(path: P, table: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        debug!("Opened state database {}", path.as_ref().display());
        Self::with_connection(conn, table)
    }

    /// Private in-memory database
    pub fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self, StoreError> {
        // The name is interpolated into SQL, it cannot be bound.
        if !is_valid_table_name(table) {
            return Err(StoreError::InvalidTable(table.to_string()));
        }
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    plc_name TEXT PRIMARY KEY NOT NULL,
                    recipe TEXT
                )"
            ),
            [],
        )?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    fn upsert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (plc_name, recipe) VALUES (?1, ?2)
             ON CONFLICT(plc_name) DO UPDATE SET recipe = excluded.recipe",
            self.table
        )
    }
}

impl StateStore for SqliteStore {
    fn load(&self, plc_name: &str) -> Result<Option<String>, StoreError> {
        let recipe: Option<Option<String>> = self
            .conn
            .query_row(
                &format!("SELECT recipe FROM {} WHERE plc_name = ?1", self.table),
                params![plc_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(recipe.flatten())
    }

    fn save(&mut self, plc_name: &str, recipe: &str) -> Result<(), StoreError> {
        self.conn.execute(&self.upsert_sql(), params![plc_name, recipe])?;
        Ok(())
    }

    fn entries(&self) -> Result<HashMap<String, String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT plc_name, recipe FROM {}", self.table))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut entries = HashMap::new();
        for row in rows {
            let (name, recipe) = row?;
            if let Some(recipe) = recipe {
                entries.insert(name, recipe);
            }
        }
        Ok(entries)
    }

    fn save_all(&mut self, states: &HashMap<String, String>) -> Result<(), StoreError> {
        let sql = self.upsert_sql();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for (name, recipe) in states {
                stmt.execute(params![name, recipe])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
