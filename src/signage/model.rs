// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Xibo CMS API payloads

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use super::SignageError;

/// Date format expected by the schedule endpoints
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `eventTypeId` of a layout/campaign event
pub const EVENT_TYPE_LAYOUT: i64 = 1;

/// Response of the client-credentials grant
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// A layout as listed by `/api/layout`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub layout_id: i64,
    #[serde(rename = "layout", default)]
    pub name: String,
    /// Layout-specific campaign; this is what gets scheduled
    pub campaign_id: i64,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

impl Layout {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagRepr {
    Object { tag: String },
    Plain(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsRepr {
    List(Vec<TagRepr>),
    Text(String),
}

/// Accept the tag shapes returned by the different CMS versions: a list of
/// `{ "tag": ... }` objects, a list of strings, or a comma separated string.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = match Option::<TagsRepr>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(TagsRepr::List(items)) => items
            .into_iter()
            .map(|item| match item {
                TagRepr::Object { tag } => tag,
                TagRepr::Plain(tag) => tag,
            })
            .collect(),
        Some(TagsRepr::Text(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
    };
    Ok(tags)
}

/// A display group as listed by `/api/displaygroup`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayGroup {
    pub display_group_id: i64,
    pub display_group: String,
}

/// An event active on a display group
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleEvent {
    pub event_id: Option<i64>,
    pub event_type_id: Option<i64>,
    pub campaign_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EventsResponse {
    #[serde(default)]
    pub events: Vec<ScheduleEvent>,
}

/// Body of `POST /api/schedule`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub event_type_id: i64,
    pub is_priority: u8,
    pub display_group_ids: Vec<i64>,
    pub from_dt: String,
    pub to_dt: String,
    pub is_always: u8,
    pub layout_id: i64,
    pub campaign_id: i64,
}

impl EventRequest {
    /// Layout event on one display group, starting `now` and lasting
    /// `duration_days`.
    ///
    /// Fails when the end date falls outside the supported calendar range.
    pub fn layout_event(
        campaign_id: i64,
        display_group_id: i64,
        now: NaiveDateTime,
        duration_days: i64,
        priority: bool,
    ) -> Result<Self, SignageError> {
        let to = Duration::try_days(duration_days)
            .and_then(|duration| now.checked_add_signed(duration))
            .ok_or_else(|| {
                SignageError::InvalidEvent(format!(
                    "event of {} days starting {} ends out of range",
                    duration_days, now
                ))
            })?;
        Ok(Self {
            event_type_id: EVENT_TYPE_LAYOUT,
            is_priority: u8::from(priority),
            display_group_ids: vec![display_group_id],
            from_dt: now.format(DATE_FORMAT).to_string(),
            to_dt: to.format(DATE_FORMAT).to_string(),
            is_always: 1,
            layout_id: campaign_id,
            campaign_id,
        })
    }
}

/// First layout tagged with both the display group name and the recipe
pub fn find_layout_by_tags<'a>(
    layouts: &'a [Layout],
    display_group: &str,
    recipe: &str,
) -> Option<&'a Layout> {
    layouts
        .iter()
        .find(|layout| layout.has_tag(display_group) && layout.has_tag(recipe))
}

/// Display group with exactly this name
pub fn find_display_group<'a>(groups: &'a [DisplayGroup], name: &str) -> Option<&'a DisplayGroup> {
    groups.iter().find(|group| group.display_group == name)
}

/// Whether a layout event for `campaign_id` is among `events`
pub fn is_campaign_running(events: &[ScheduleEvent], campaign_id: i64) -> bool {
    events.iter().any(|event| {
        event.event_type_id == Some(EVENT_TYPE_LAYOUT) && event.campaign_id == Some(campaign_id)
    })
}
