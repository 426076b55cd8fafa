// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use super::*;
use crate::config::{PlcConfig, PlcDriverType, RecipeEncoding};
use crate::persistence::{MemoryStore, StoreError};
use crate::plc::drivers::{MockPlcDriver, MockPlcHandle};
use crate::signage::{MockSignageApi, ScheduleEvent, SignageError};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 24)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn reader(name: &str, group: &str, recipe: &str) -> (PlcReader, MockPlcHandle) {
    let config = PlcConfig {
        name: name.to_string(),
        display_group: group.to_string(),
        driver: PlcDriverType::Mock,
        mock_recipe: Some(recipe.to_string()),
        ..PlcConfig::default()
    };
    let driver = MockPlcDriver::new(recipe, RecipeEncoding::S7String);
    let handle = driver.handle();
    (PlcReader::new(&config, Box::new(driver)), handle)
}

fn layout(layout_id: i64, campaign_id: i64, tags: &[&str]) -> Layout {
    Layout {
        layout_id,
        name: format!("layout {}", layout_id),
        campaign_id,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn layouts() -> Vec<Layout> {
    vec![
        layout(1, 11, &["Line 1", "R1"]),
        layout(2, 12, &["Line 1", "R2"]),
        layout(3, 21, &["Line 2", "R1"]),
    ]
}

fn groups() -> Vec<DisplayGroup> {
    vec![
        DisplayGroup {
            display_group_id: 7,
            display_group: "Line 1".to_string(),
        },
        DisplayGroup {
            display_group_id: 8,
            display_group: "Line 2".to_string(),
        },
    ]
}

fn running(campaign_id: i64) -> ScheduleEvent {
    ScheduleEvent {
        event_id: Some(100),
        event_type_id: Some(1),
        campaign_id: Some(campaign_id),
    }
}

fn server_error() -> SignageError {
    SignageError::Status {
        status: 500,
        body: "boom".to_string(),
    }
}

/// Store whose reads and writes always fail
struct BrokenStore;

fn disk_error() -> StoreError {
    StoreError::Io(io::Error::other("disk unavailable"))
}

impl StateStore for BrokenStore {
    fn load(&self, _plc_name: &str) -> Result<Option<String>, StoreError> {
        Err(disk_error())
    }

    fn save(&mut self, _plc_name: &str, _recipe: &str) -> Result<(), StoreError> {
        Err(disk_error())
    }

    fn entries(&self) -> Result<HashMap<String, String>, StoreError> {
        Err(disk_error())
    }

    fn save_all(&mut self, _states: &HashMap<String, String>) -> Result<(), StoreError> {
        Err(disk_error())
    }
}

fn reconciler(
    readers: Vec<PlcReader>,
    store: MemoryStore,
    signage: MockSignageApi,
    options: ReconcileOptions,
) -> Reconciler {
    Reconciler::new(readers, Box::new(store), Box::new(signage), options)
}

#[tokio::test]
async fn schedules_new_recipe_and_persists_it() {
    let (reader, _plc) = reader("line1", "Line 1", "R1");
    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().times(1).returning(|| Ok(()));
    signage.expect_layouts().returning(|| Ok(layouts()));
    signage.expect_display_groups().returning(|| Ok(groups()));
    signage
        .expect_current_events()
        .withf(|id, at| *id == 7 && *at == now())
        .times(1)
        .returning(|_, _| Ok(vec![]));
    signage
        .expect_create_event()
        .withf(|request| {
            request.campaign_id == 11
                && request.layout_id == 11
                && request.display_group_ids == vec![7]
                && request.from_dt == "2025-03-24 08:00:00"
        })
        .times(1)
        .returning(|_| Ok(()));

    let mut reconciler = reconciler(
        vec![reader],
        MemoryStore::new(),
        signage,
        ReconcileOptions::default(),
    );
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert_eq!(
        report.outcome("line1"),
        Some(&PlcOutcome::Scheduled {
            recipe: "R1".to_string(),
            campaign_id: 11,
            display_group_id: 7,
        })
    );
    assert_eq!(report.scheduled(), 1);
    assert_eq!(
        reconciler.store().load("line1").unwrap().as_deref(),
        Some("R1")
    );
}

#[tokio::test]
async fn running_layout_is_not_scheduled_twice() {
    let (reader, _plc) = reader("line1", "Line 1", "R1");
    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().returning(|| Ok(layouts()));
    signage.expect_display_groups().returning(|| Ok(groups()));
    signage
        .expect_current_events()
        .returning(|_, _| Ok(vec![running(11)]));
    signage.expect_create_event().times(0);

    let mut reconciler = reconciler(
        vec![reader],
        MemoryStore::new(),
        signage,
        ReconcileOptions::default(),
    );
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert_eq!(
        report.outcome("line1"),
        Some(&PlcOutcome::AlreadyScheduled {
            recipe: "R1".to_string(),
            campaign_id: 11,
        })
    );
    assert_eq!(
        reconciler.store().load("line1").unwrap().as_deref(),
        Some("R1")
    );
}

#[tokio::test]
async fn missing_layout_keeps_previous_state() {
    let (reader, _plc) = reader("line1", "Line 1", "R9");
    let mut store = MemoryStore::new();
    store.save("line1", "R1").unwrap();

    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().returning(|| Ok(layouts()));
    signage.expect_display_groups().times(0);
    signage.expect_current_events().times(0);
    signage.expect_create_event().times(0);

    let mut reconciler = reconciler(vec![reader], store, signage, ReconcileOptions::default());
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert_eq!(
        report.outcome("line1"),
        Some(&PlcOutcome::NoLayout {
            recipe: "R9".to_string()
        })
    );
    assert_eq!(report.plcs[0].previous.as_deref(), Some("R1"));
    assert_eq!(
        reconciler.store().load("line1").unwrap().as_deref(),
        Some("R1")
    );
}

#[tokio::test]
async fn missing_display_group_is_reported() {
    let (reader, _plc) = reader("line1", "Line 1", "R1");
    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().returning(|| Ok(layouts()));
    signage.expect_display_groups().returning(|| {
        Ok(vec![DisplayGroup {
            display_group_id: 8,
            display_group: "Line 2".to_string(),
        }])
    });
    signage.expect_current_events().times(0);
    signage.expect_create_event().times(0);

    let mut reconciler = reconciler(
        vec![reader],
        MemoryStore::new(),
        signage,
        ReconcileOptions::default(),
    );
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert_eq!(
        report.outcome("line1"),
        Some(&PlcOutcome::NoDisplayGroup {
            recipe: "R1".to_string()
        })
    );
    assert_eq!(reconciler.store().load("line1").unwrap(), None);
}

#[tokio::test]
async fn failed_creation_is_retried_on_next_cycle() {
    let (reader, _plc) = reader("line1", "Line 1", "R2");
    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().times(2).returning(|| Ok(()));
    signage.expect_layouts().returning(|| Ok(layouts()));
    signage.expect_display_groups().returning(|| Ok(groups()));
    signage
        .expect_current_events()
        .times(2)
        .returning(|_, _| Ok(vec![]));
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    signage
        .expect_create_event()
        .times(2)
        .returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(server_error())
            } else {
                Ok(())
            }
        });

    let mut reconciler = reconciler(
        vec![reader],
        MemoryStore::new(),
        signage,
        ReconcileOptions::default(),
    );

    let first = reconciler.run_cycle_at(now()).await.unwrap();
    assert!(matches!(
        first.outcome("line1"),
        Some(PlcOutcome::Failed { .. })
    ));
    assert_eq!(first.unsettled(), 1);
    assert_eq!(reconciler.store().load("line1").unwrap(), None);

    let second = reconciler.run_cycle_at(now()).await.unwrap();
    assert!(matches!(
        second.outcome("line1"),
        Some(PlcOutcome::Scheduled { campaign_id: 12, .. })
    ));
    assert_eq!(
        reconciler.store().load("line1").unwrap().as_deref(),
        Some("R2")
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unchanged_recipe_skips_cms_when_verification_disabled() {
    let (reader, plc) = reader("line1", "Line 1", "R1");
    let mut store = MemoryStore::new();
    store.save("line1", "R1").unwrap();

    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().times(0);
    signage.expect_display_groups().times(0);
    signage.expect_create_event().times(0);

    let options = ReconcileOptions {
        verify_unchanged: false,
        ..ReconcileOptions::default()
    };
    let mut reconciler = reconciler(vec![reader], store, signage, options);
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert_eq!(
        report.outcome("line1"),
        Some(&PlcOutcome::Unchanged {
            recipe: "R1".to_string()
        })
    );
    assert_eq!(plc.reads(), 1);
}

#[tokio::test]
async fn unchanged_recipe_recreates_removed_event() {
    let (reader, _plc) = reader("line1", "Line 1", "R1");
    let mut store = MemoryStore::new();
    store.save("line1", "R1").unwrap();

    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().returning(|| Ok(layouts()));
    signage.expect_display_groups().returning(|| Ok(groups()));
    signage
        .expect_current_events()
        .returning(|_, _| Ok(vec![running(12)]));
    signage
        .expect_create_event()
        .withf(|request| request.campaign_id == 11)
        .times(1)
        .returning(|_| Ok(()));

    let mut reconciler = reconciler(vec![reader], store, signage, ReconcileOptions::default());
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert!(matches!(
        report.outcome("line1"),
        Some(PlcOutcome::Scheduled { campaign_id: 11, .. })
    ));
}

#[tokio::test]
async fn authentication_failure_aborts_cycle() {
    let (reader, plc) = reader("line1", "Line 1", "R1");
    let mut signage = MockSignageApi::new();
    signage
        .expect_authenticate()
        .times(1)
        .returning(|| Err(server_error()));
    signage.expect_layouts().times(0);

    let mut reconciler = reconciler(
        vec![reader],
        MemoryStore::new(),
        signage,
        ReconcileOptions::default(),
    );

    assert!(reconciler.run_cycle_at(now()).await.is_err());
    assert_eq!(plc.reads(), 0);
    assert_eq!(reconciler.store().load("line1").unwrap(), None);
}

#[tokio::test]
async fn unreadable_plc_does_not_block_the_others() {
    let (offline, offline_plc) = reader("line1", "Line 1", "R1");
    offline_plc.set_online(false);
    let (online, _plc) = reader("line2", "Line 2", "R1");

    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().times(1).returning(|| Ok(layouts()));
    signage.expect_display_groups().returning(|| Ok(groups()));
    signage
        .expect_current_events()
        .withf(|id, _| *id == 8)
        .returning(|_, _| Ok(vec![]));
    signage
        .expect_create_event()
        .withf(|request| request.campaign_id == 21 && request.display_group_ids == vec![8])
        .times(1)
        .returning(|_| Ok(()));

    let mut reconciler = reconciler(
        vec![offline, online],
        MemoryStore::new(),
        signage,
        ReconcileOptions::default(),
    );
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert!(matches!(
        report.outcome("line1"),
        Some(PlcOutcome::ReadFailed(_))
    ));
    assert!(matches!(
        report.outcome("line2"),
        Some(PlcOutcome::Scheduled { .. })
    ));
    assert_eq!(reconciler.store().load("line1").unwrap(), None);
    assert_eq!(
        reconciler.store().load("line2").unwrap().as_deref(),
        Some("R1")
    );
}

#[tokio::test]
async fn empty_recipe_is_skipped() {
    let (reader, _plc) = reader("line1", "Line 1", "");
    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().times(0);

    let mut reconciler = reconciler(
        vec![reader],
        MemoryStore::new(),
        signage,
        ReconcileOptions::default(),
    );
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert_eq!(report.outcome("line1"), Some(&PlcOutcome::NoRecipe));
    assert_eq!(report.unsettled(), 0);
}

#[tokio::test]
async fn listings_are_fetched_once_per_cycle() {
    let (first, _a) = reader("line1", "Line 1", "R1");
    let (second, _b) = reader("line2", "Line 2", "R1");

    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().times(1).returning(|| Ok(layouts()));
    signage
        .expect_display_groups()
        .times(1)
        .returning(|| Ok(groups()));
    signage
        .expect_current_events()
        .times(2)
        .returning(|_, _| Ok(vec![]));
    signage
        .expect_create_event()
        .times(2)
        .returning(|_| Ok(()));

    let mut reconciler = reconciler(
        vec![first, second],
        MemoryStore::new(),
        signage,
        ReconcileOptions::default(),
    );
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert_eq!(report.scheduled(), 2);
    assert_eq!(report.summary(), "2 PLCs processed, 2 events created, 0 unsettled");
}

#[tokio::test]
async fn recipe_change_between_cycles_schedules_new_layout() {
    let (reader, plc) = reader("line1", "Line 1", "R1");
    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().times(2).returning(|| Ok(()));
    signage.expect_layouts().times(2).returning(|| Ok(layouts()));
    signage
        .expect_display_groups()
        .times(2)
        .returning(|| Ok(groups()));
    signage
        .expect_current_events()
        .times(2)
        .returning(|_, _| Ok(vec![running(11)]));
    signage
        .expect_create_event()
        .withf(|request| request.campaign_id == 12)
        .times(1)
        .returning(|_| Ok(()));

    let mut reconciler = reconciler(
        vec![reader],
        MemoryStore::new(),
        signage,
        ReconcileOptions::default(),
    );

    let first = reconciler.run_cycle_at(now()).await.unwrap();
    assert!(matches!(
        first.outcome("line1"),
        Some(PlcOutcome::AlreadyScheduled { campaign_id: 11, .. })
    ));

    plc.set_recipe("R2");
    let second = reconciler.run_cycle_at(now()).await.unwrap();
    assert_eq!(second.plcs[0].previous.as_deref(), Some("R1"));
    assert!(matches!(
        second.outcome("line1"),
        Some(PlcOutcome::Scheduled { campaign_id: 12, .. })
    ));
    assert_eq!(
        reconciler.store().load("line1").unwrap().as_deref(),
        Some("R2")
    );
}

#[tokio::test]
async fn out_of_range_event_fails_without_persisting() {
    let (reader, _plc) = reader("line1", "Line 1", "R1");
    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().returning(|| Ok(layouts()));
    signage.expect_display_groups().returning(|| Ok(groups()));
    signage
        .expect_current_events()
        .returning(|_, _| Ok(vec![]));
    signage.expect_create_event().times(0);

    let options = ReconcileOptions {
        event_duration_days: i64::MAX,
        ..ReconcileOptions::default()
    };
    let mut reconciler = reconciler(vec![reader], MemoryStore::new(), signage, options);
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    match report.outcome("line1") {
        Some(PlcOutcome::Failed { recipe, reason }) => {
            assert_eq!(recipe, "R1");
            assert!(reason.contains("out of range"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(reconciler.store().load("line1").unwrap(), None);
}

#[tokio::test]
async fn unreadable_store_still_checks_running_layout() {
    let (reader, _plc) = reader("line1", "Line 1", "R1");
    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().returning(|| Ok(layouts()));
    signage.expect_display_groups().returning(|| Ok(groups()));
    signage
        .expect_current_events()
        .times(1)
        .returning(|_, _| Ok(vec![running(11)]));
    signage.expect_create_event().times(0);

    let mut reconciler = Reconciler::new(
        vec![reader],
        Box::new(BrokenStore),
        Box::new(signage),
        ReconcileOptions::default(),
    );
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert_eq!(report.plcs[0].previous, None);
    assert_eq!(
        report.outcome("line1"),
        Some(&PlcOutcome::AlreadyScheduled {
            recipe: "R1".to_string(),
            campaign_id: 11,
        })
    );
}

#[tokio::test]
async fn failed_save_still_reports_scheduled_event() {
    let (reader, _plc) = reader("line1", "Line 1", "R2");
    let mut signage = MockSignageApi::new();
    signage.expect_authenticate().returning(|| Ok(()));
    signage.expect_layouts().returning(|| Ok(layouts()));
    signage.expect_display_groups().returning(|| Ok(groups()));
    signage
        .expect_current_events()
        .returning(|_, _| Ok(vec![]));
    signage
        .expect_create_event()
        .withf(|request| request.campaign_id == 12)
        .times(1)
        .returning(|_| Ok(()));

    let mut reconciler = Reconciler::new(
        vec![reader],
        Box::new(BrokenStore),
        Box::new(signage),
        ReconcileOptions::default(),
    );
    let report = reconciler.run_cycle_at(now()).await.unwrap();

    assert_eq!(
        report.outcome("line1"),
        Some(&PlcOutcome::Scheduled {
            recipe: "R2".to_string(),
            campaign_id: 12,
            display_group_id: 7,
        })
    );
    assert!(reconciler.store().load("line1").is_err());
}
