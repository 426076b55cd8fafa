// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Recipe signage library
//!
//! Polls the recipe currently selected on a set of PLCs and keeps the
//! matching layout scheduled on each line's display group in a Xibo CMS.

pub mod config;
pub mod daemon;
pub mod logging;
pub mod persistence;
pub mod plc;
pub mod reconcile;
pub mod restart;
pub mod signage;

pub use config::Config;
pub use reconcile::{CycleReport, PlcOutcome, Reconciler};
