// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Recipe to signage reconciliation
//!
//! One cycle walks the configured PLCs in order. For each of them:
//!
//! 1. read the current recipe; an unreadable or empty PLC is skipped
//! 2. compare it with the stored recipe
//! 3. find the layout tagged with both the display group name and the recipe
//! 4. resolve the display group id
//! 5. if that layout is already running on the group, nothing is created;
//!    otherwise a new layout event is scheduled
//!
//! The stored recipe only moves once step 5 has confirmed the signage shows
//! it. A PLC whose layout is missing or whose event creation failed keeps
//! its previous state and is retried on the next cycle, and the running
//! check keeps those retries from stacking duplicate events.

mod report;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use log::{error, info, warn};

use crate::config::Config;
use crate::persistence::{self, StateStore};
use crate::plc::PlcReader;
use crate::signage::{
    find_display_group, find_layout_by_tags, is_campaign_running, DisplayGroup, EventRequest,
    Layout, SignageApi, XiboClient,
};

pub use report::{CycleReport, PlcOutcome, PlcReport};

/// Decision settings of the reconciliation
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Check the schedule even when the recipe did not change
    pub verify_unchanged: bool,
    pub event_duration_days: i64,
    pub priority: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            verify_unchanged: true,
            event_duration_days: 365,
            priority: false,
        }
    }
}

impl ReconcileOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            verify_unchanged: config.daemon.verify_unchanged,
            event_duration_days: config.signage.event_duration_days,
            priority: config.signage.priority,
        }
    }
}

/// CMS listings fetched at most once per cycle
#[derive(Default)]
struct CycleCache {
    layouts: Option<Vec<Layout>>,
    display_groups: Option<Vec<DisplayGroup>>,
}

impl CycleCache {
    async fn layouts(&mut self, signage: &dyn SignageApi) -> Result<&[Layout]> {
        if self.layouts.is_none() {
            let layouts = signage.layouts().await.context("Error listing layouts")?;
            self.layouts = Some(layouts);
        }
        Ok(self.layouts.as_deref().unwrap_or_default())
    }

    async fn display_groups(&mut self, signage: &dyn SignageApi) -> Result<&[DisplayGroup]> {
        if self.display_groups.is_none() {
            let groups = signage
                .display_groups()
                .await
                .context("Error listing display groups")?;
            self.display_groups = Some(groups);
        }
        Ok(self.display_groups.as_deref().unwrap_or_default())
    }
}

/// Drives the read, compare, act loop over all configured PLCs
pub struct Reconciler {
    readers: Vec<PlcReader>,
    store: Box<dyn StateStore>,
    signage: Box<dyn SignageApi>,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(
        readers: Vec<PlcReader>,
        store: Box<dyn StateStore>,
        signage: Box<dyn SignageApi>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            readers,
            store,
            signage,
            options,
        }
    }

    /// Wire the PLC readers, state store and CMS client described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let readers = config.plcs.iter().map(PlcReader::from_config).collect();
        let store = persistence::open_store(&config.persistence)
            .context("Failed to open the state store")?;
        let names: Vec<String> = config.plcs.iter().map(|plc| plc.name.clone()).collect();
        match store.load_all(&names) {
            Ok(states) => info!("Loaded PLC states: {:?}", states),
            Err(e) => warn!("Could not load stored PLC states: {}", e),
        }
        let signage =
            XiboClient::new(&config.signage).context("Failed to create the signage client")?;
        Ok(Self::new(
            readers,
            store,
            Box::new(signage),
            ReconcileOptions::from_config(config),
        ))
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    /// Run one cycle at the current local time
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.run_cycle_at(Local::now().naive_local()).await
    }

    /// Run one cycle as if it were `now`.
    ///
    /// Fails only when no access token can be obtained; per-PLC problems
    /// are reported in the returned [`CycleReport`].
    pub async fn run_cycle_at(&mut self, now: NaiveDateTime) -> Result<CycleReport> {
        self.signage
            .authenticate()
            .await
            .context("Could not obtain the signage access token, aborting cycle")?;

        info!("Reading cycle started");
        let mut report = CycleReport::new(now);
        let mut cache = CycleCache::default();

        for reader in self.readers.iter_mut() {
            let plc_report = reconcile_plc(
                reader,
                self.store.as_mut(),
                self.signage.as_ref(),
                &mut cache,
                &self.options,
                now,
            )
            .await;
            info!("PLC {}: {}", plc_report.plc, plc_report.outcome);
            report.plcs.push(plc_report);
        }

        info!("Reading cycle finished: {}", report.summary());
        Ok(report)
    }
}

async fn reconcile_plc(
    reader: &mut PlcReader,
    store: &mut dyn StateStore,
    signage: &dyn SignageApi,
    cache: &mut CycleCache,
    options: &ReconcileOptions,
    now: NaiveDateTime,
) -> PlcReport {
    let plc = reader.name().to_string();
    let group = reader.display_group().to_string();
    info!("Processing PLC: {} (Group: {})", plc, group);

    let previous = match store.load(&plc) {
        Ok(previous) => previous,
        Err(e) => {
            warn!("Could not load stored state of {}: {}", plc, e);
            None
        }
    };
    let report = |outcome| PlcReport {
        plc: plc.clone(),
        previous: previous.clone(),
        outcome,
    };

    let recipe = match reader.read_recipe().await {
        Ok(Some(recipe)) => recipe,
        Ok(None) => {
            warn!("No recipe available for {}", plc);
            return report(PlcOutcome::NoRecipe);
        }
        Err(e) => return report(PlcOutcome::ReadFailed(e.to_string())),
    };

    let changed = previous.as_deref() != Some(recipe.as_str());
    if changed {
        info!(
            "Recipe changed for {} (previous: {:?} => new: {})",
            plc, previous, recipe
        );
    } else {
        info!("Recipe unchanged for {}", plc);
        if !options.verify_unchanged {
            return report(PlcOutcome::Unchanged { recipe });
        }
    }

    let campaign_id = match cache.layouts(signage).await {
        Ok(layouts) => match find_layout_by_tags(layouts, &group, &recipe) {
            Some(layout) => {
                info!(
                    "Selected layout -> LayoutID: {} CampaignID: {} Name: '{}'",
                    layout.layout_id, layout.campaign_id, layout.name
                );
                layout.campaign_id
            }
            None => {
                warn!("No layout found for {} with recipe {}", plc, recipe);
                return report(PlcOutcome::NoLayout { recipe });
            }
        },
        Err(e) => {
            error!("{:#}", e);
            return report(PlcOutcome::Failed {
                recipe,
                reason: format!("{:#}", e),
            });
        }
    };

    let display_group_id = match cache.display_groups(signage).await {
        Ok(groups) => match find_display_group(groups, &group) {
            Some(found) => found.display_group_id,
            None => {
                warn!("Display group not found: {}", group);
                return report(PlcOutcome::NoDisplayGroup { recipe });
            }
        },
        Err(e) => {
            error!("{:#}", e);
            return report(PlcOutcome::Failed {
                recipe,
                reason: format!("{:#}", e),
            });
        }
    };

    let events = match signage.current_events(display_group_id, now).await {
        Ok(events) => events,
        Err(e) => {
            error!("Error querying current events of group '{}': {}", group, e);
            return report(PlcOutcome::Failed {
                recipe,
                reason: e.to_string(),
            });
        }
    };

    let outcome = if is_campaign_running(&events, campaign_id) {
        info!(
            "Layout/campaign {} is already running on group '{}'",
            campaign_id, group
        );
        PlcOutcome::AlreadyScheduled {
            recipe: recipe.clone(),
            campaign_id,
        }
    } else {
        let request = match EventRequest::layout_event(
            campaign_id,
            display_group_id,
            now,
            options.event_duration_days,
            options.priority,
        ) {
            Ok(request) => request,
            Err(e) => {
                error!("Cannot build layout event for {}: {}", plc, e);
                return report(PlcOutcome::Failed {
                    recipe,
                    reason: e.to_string(),
                });
            }
        };
        match signage.create_event(&request).await {
            Ok(()) => {
                info!(
                    "Event created: layout {} -> group '{}' (ID {})",
                    campaign_id, group, display_group_id
                );
                PlcOutcome::Scheduled {
                    recipe: recipe.clone(),
                    campaign_id,
                    display_group_id,
                }
            }
            Err(e) => {
                error!("Error creating layout event: {}", e);
                return report(PlcOutcome::Failed {
                    recipe,
                    reason: e.to_string(),
                });
            }
        }
    };

    if changed {
        if let Err(e) = store.save(&plc, &recipe) {
            error!("Could not persist recipe {} for {}: {}", recipe, plc, e);
        }
    }
    report(outcome)
}

#[cfg(test)]
mod tests;
