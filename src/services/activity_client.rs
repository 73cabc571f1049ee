// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the activity-log API.
//!
//! Used by the field app's cache; the [`ActivityLogSource`] trait lets tests
//! substitute an in-memory backend.

use crate::error::AppError;
use crate::models::{ActivityLogPage, ActivityLogQuery, ActivityLogRecord, AssignTaskRequest};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::Deserialize;

/// Where the activity-log cache gets authoritative data from.
pub trait ActivityLogSource: Send + Sync {
    /// Fetch one page of activity logs.
    fn list(&self, query: &ActivityLogQuery) -> BoxFuture<'_, Result<ActivityLogPage, AppError>>;

    /// Fetch records matching `query`'s filters created after `since`.
    fn list_since(
        &self,
        query: &ActivityLogQuery,
        since: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Vec<ActivityLogRecord>, AppError>>;

    /// Assign a janitor to an activity; returns the updated record.
    fn assign_task(
        &self,
        request: &AssignTaskRequest,
    ) -> BoxFuture<'_, Result<ActivityLogRecord, AppError>>;
}

/// Activity-log API client.
#[derive(Clone)]
pub struct ActivityLogClient {
    http: reqwest::Client,
    base_url: String,
}

impl ActivityLogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn list_page(&self, query: ActivityLogQuery) -> Result<ActivityLogPage, AppError> {
        let url = format!("{}/api/activitylogs", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        check_response_json(response).await
    }

    async fn list_recent(
        &self,
        query: ActivityLogQuery,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityLogRecord>, AppError> {
        let url = format!("{}/api/activitylogs/recent", self.base_url);

        let mut params = vec![("since", format_utc_rfc3339(since))];
        if let Some(t) = query.activity_type {
            params.push(("type", t));
        }
        if let Some(u) = query.user_id {
            params.push(("user_id", u));
        }
        if let Some(s) = query.status {
            params.push(("status", s.as_str().to_string()));
        }

        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        let body: RecentResponse = check_response_json(response).await?;
        Ok(body.activities)
    }

    async fn post_assign(&self, request: AssignTaskRequest) -> Result<ActivityLogRecord, AppError> {
        let url = format!("{}/api/assign-task", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        check_response_json(response).await
    }
}

impl ActivityLogSource for ActivityLogClient {
    fn list(&self, query: &ActivityLogQuery) -> BoxFuture<'_, Result<ActivityLogPage, AppError>> {
        Box::pin(self.list_page(query.clone()))
    }

    fn list_since(
        &self,
        query: &ActivityLogQuery,
        since: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Vec<ActivityLogRecord>, AppError>> {
        Box::pin(self.list_recent(query.clone(), since))
    }

    fn assign_task(
        &self,
        request: &AssignTaskRequest,
    ) -> BoxFuture<'_, Result<ActivityLogRecord, AppError>> {
        Box::pin(self.post_assign(request.clone()))
    }
}

#[derive(Deserialize)]
struct RecentResponse {
    activities: Vec<ActivityLogRecord>,
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(match status.as_u16() {
            400 => AppError::BadRequest(body),
            404 => AppError::NotFound(body),
            _ => AppError::Upstream(format!("HTTP {}: {}", status, body)),
        });
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))
}
