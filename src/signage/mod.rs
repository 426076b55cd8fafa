// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Digital signage API
//!
//! The daemon drives a Xibo CMS through a handful of REST calls:
//!
//! ```text
//! POST /api/authorize/access_token      client-credentials token
//! GET  /api/layout                      layouts and their tags
//! GET  /api/displaygroup                display group ids by name
//! GET  /api/schedule/{id}/events?date=  events active at a given time
//! POST /api/schedule                    new layout event
//! ```
//!
//! [`SignageApi`] abstracts those calls so the reconciliation logic can be
//! exercised without a CMS; [`XiboClient`] is the HTTP implementation.

pub mod client;
pub mod model;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

pub use client::XiboClient;
pub use model::{
    find_display_group, find_layout_by_tags, is_campaign_running, AccessToken, DisplayGroup,
    EventRequest, Layout, ScheduleEvent, DATE_FORMAT, EVENT_TYPE_LAYOUT,
};

#[derive(Error, Debug)]
pub enum SignageError {
    #[error("No access token, authenticate first")]
    NotAuthenticated,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CMS answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid CMS URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

/// Operations the reconciliation loop needs from the signage CMS
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignageApi: Send + Sync {
    /// Obtain a fresh access token used by every following call
    async fn authenticate(&mut self) -> Result<(), SignageError>;

    async fn layouts(&self) -> Result<Vec<Layout>, SignageError>;

    async fn display_groups(&self) -> Result<Vec<DisplayGroup>, SignageError>;

    /// Events active on the display group at `at`
    async fn current_events(
        &self,
        display_group_id: i64,
        at: NaiveDateTime,
    ) -> Result<Vec<ScheduleEvent>, SignageError>;

    async fn create_event(&self, request: &EventRequest) -> Result<(), SignageError>;
}
