// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Outcome of a reconciliation cycle

use std::fmt;

use chrono::NaiveDateTime;

/// What happened to one PLC during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlcOutcome {
    /// The PLC could not be read
    ReadFailed(String),
    /// The PLC answered with an empty recipe
    NoRecipe,
    /// Same recipe as stored and verification of unchanged recipes is off
    Unchanged { recipe: String },
    /// No layout carries both the display group and the recipe tags
    NoLayout { recipe: String },
    /// The display group does not exist in the CMS
    NoDisplayGroup { recipe: String },
    /// The matching layout is already running on the display group
    AlreadyScheduled { recipe: String, campaign_id: i64 },
    /// A new event was created
    Scheduled {
        recipe: String,
        campaign_id: i64,
        display_group_id: i64,
    },
    /// A CMS call failed
    Failed { recipe: String, reason: String },
}

impl PlcOutcome {
    /// Whether the signage side now shows the current recipe
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            PlcOutcome::Unchanged { .. }
                | PlcOutcome::AlreadyScheduled { .. }
                | PlcOutcome::Scheduled { .. }
        )
    }
}

impl fmt::Display for PlcOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlcOutcome::ReadFailed(reason) => write!(f, "read failed ({})", reason),
            PlcOutcome::NoRecipe => write!(f, "no recipe"),
            PlcOutcome::Unchanged { recipe } => write!(f, "unchanged '{}'", recipe),
            PlcOutcome::NoLayout { recipe } => write!(f, "no layout for '{}'", recipe),
            PlcOutcome::NoDisplayGroup { recipe } => {
                write!(f, "display group missing for '{}'", recipe)
            }
            PlcOutcome::AlreadyScheduled {
                recipe,
                campaign_id,
            } => write!(f, "'{}' already running (campaign {})", recipe, campaign_id),
            PlcOutcome::Scheduled {
                recipe,
                campaign_id,
                display_group_id,
            } => write!(
                f,
                "'{}' scheduled (campaign {} on group {})",
                recipe, campaign_id, display_group_id
            ),
            PlcOutcome::Failed { recipe, reason } => {
                write!(f, "failed for '{}' ({})", recipe, reason)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlcReport {
    pub plc: String,
    /// Recipe stored before this cycle
    pub previous: Option<String>,
    pub outcome: PlcOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: NaiveDateTime,
    pub plcs: Vec<PlcReport>,
}

impl CycleReport {
    pub fn new(started_at: NaiveDateTime) -> Self {
        Self {
            started_at,
            plcs: Vec::new(),
        }
    }

    pub fn outcome(&self, plc: &str) -> Option<&PlcOutcome> {
        self.plcs.iter().find(|r| r.plc == plc).map(|r| &r.outcome)
    }

    pub fn scheduled(&self) -> usize {
        self.plcs
            .iter()
            .filter(|r| matches!(r.outcome, PlcOutcome::Scheduled { .. }))
            .count()
    }

    /// PLCs whose signage state could not be confirmed
    pub fn unsettled(&self) -> usize {
        self.plcs
            .iter()
            .filter(|r| r.outcome != PlcOutcome::NoRecipe && !r.outcome.is_settled())
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} PLCs processed, {} events created, {} unsettled",
            self.plcs.len(),
            self.scheduled(),
            self.unsettled()
        )
    }
}
