// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Xibo CMS HTTP client

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use reqwest::Response;
use serde::de::DeserializeOwned;
use url::Url;

use super::model::{
    AccessToken, DisplayGroup, EventRequest, EventsResponse, Layout, ScheduleEvent, DATE_FORMAT,
};
use super::{SignageApi, SignageError};
use crate::config::SignageConfig;

const AUTH_ENDPOINT: &str = "api/authorize/access_token";
const LAYOUT_ENDPOINT: &str = "api/layout";
const DISPLAYGROUP_ENDPOINT: &str = "api/displaygroup";
const SCHEDULE_ENDPOINT: &str = "api/schedule";

/// REST client for the Xibo CMS
#[derive(Debug)]
pub struct XiboClient {
    base_url: Url,
    client_id: String,
    client_secret: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl XiboClient {
    pub fn new(config: &SignageConfig) -> Result<Self, SignageError> {
        // Url::join replaces the last path segment unless the base ends with '/'
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("recipe-signage/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!("Signage client initialized for {}", base_url);
        Ok(Self {
            base_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            client,
            token: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<Url, SignageError> {
        Ok(self.base_url.join(path)?)
    }

    fn token(&self) -> Result<&str, SignageError> {
        self.token.as_deref().ok_or(SignageError::NotAuthenticated)
    }

    /// Turn non-2xx responses into [`SignageError::Status`]
    async fn check_status(response: Response) -> Result<Response, SignageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("CMS request failed with {}: {}", status, body);
        Err(SignageError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SignageError> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token()?)
            .query(query)
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json::<T>().await?)
    }
}

#[async_trait]
impl SignageApi for XiboClient {
    async fn authenticate(&mut self) -> Result<(), SignageError> {
        let url = self.endpoint(AUTH_ENDPOINT)?;
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = self.client.post(url).form(&form).send().await?;
        let token: AccessToken = Self::check_status(response).await?.json().await?;
        self.token = Some(token.access_token);
        info!("Signage access token obtained");
        Ok(())
    }

    async fn layouts(&self) -> Result<Vec<Layout>, SignageError> {
        let layouts: Vec<Layout> = self.get_json(LAYOUT_ENDPOINT, &[]).await?;
        for layout in &layouts {
            debug!(
                "LayoutID: {}, CampaignID: {}, Name: {}, Tags: {:?}",
                layout.layout_id, layout.campaign_id, layout.name, layout.tags
            );
        }
        Ok(layouts)
    }

    async fn display_groups(&self) -> Result<Vec<DisplayGroup>, SignageError> {
        self.get_json(DISPLAYGROUP_ENDPOINT, &[]).await
    }

    async fn current_events(
        &self,
        display_group_id: i64,
        at: NaiveDateTime,
    ) -> Result<Vec<ScheduleEvent>, SignageError> {
        let path = format!("{}/{}/events", SCHEDULE_ENDPOINT, display_group_id);
        let response: EventsResponse = self
            .get_json(&path, &[("date", at.format(DATE_FORMAT).to_string())])
            .await?;
        Ok(response.events)
    }

    async fn create_event(&self, request: &EventRequest) -> Result<(), SignageError> {
        let url = self.endpoint(SCHEDULE_ENDPOINT)?;
        debug!("POST {} {:?}", url, request);
        let response = self
            .client
            .post(url)
            .bearer_auth(self.token()?)
            .json(request)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
