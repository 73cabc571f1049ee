// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity-log and staff API routes.

use crate::error::{AppError, Result};
use crate::models::{
    ActivityLogPage, ActivityLogQuery, ActivityLogRecord, ActivityStatus, AssignTaskRequest,
    Janitor,
};
use crate::time_utils::parse_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_LIMIT: u32 = 200;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activitylogs", get(list_activity_logs))
        .route("/api/activitylogs/recent", get(list_recent_activity_logs))
        .route("/api/assign-task", post(assign_task))
        .route("/api/janitors", get(list_janitors))
}

// ─── Activity Logs ───────────────────────────────────────────

/// Raw query string; `status` is parsed by hand so a bad value yields our
/// JSON error body instead of the extractor's plain-text rejection.
#[derive(Deserialize)]
struct ActivityLogParams {
    limit: Option<u32>,
    offset: Option<u32>,
    #[serde(rename = "type")]
    activity_type: Option<String>,
    user_id: Option<String>,
    status: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ActivityLogParams {
    fn into_query(self) -> Result<ActivityLogQuery> {
        let defaults = ActivityLogQuery::default();

        let limit = self.limit.unwrap_or(defaults.limit);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(AppError::BadRequest(format!(
                "'limit' must be between 1 and {}",
                MAX_LIMIT
            )));
        }

        let status = non_empty(self.status)
            .map(|s| s.parse::<ActivityStatus>())
            .transpose()
            .map_err(|e| AppError::BadRequest(format!("Invalid 'status': {}", e)))?;

        Ok(ActivityLogQuery {
            limit,
            offset: self.offset.unwrap_or(0),
            activity_type: non_empty(self.activity_type),
            user_id: non_empty(self.user_id),
            status,
        })
    }
}

/// List activity logs, newest first.
async fn list_activity_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityLogParams>,
) -> Result<Json<ActivityLogPage>> {
    let query = params.into_query()?;

    tracing::debug!(
        limit = query.limit,
        offset = query.offset,
        activity_type = ?query.activity_type,
        user_id = ?query.user_id,
        status = ?query.status,
        "Fetching activity logs"
    );

    let page = state.db.list_activity_logs(&query).await?;
    Ok(Json(page))
}

#[derive(Deserialize)]
struct RecentParams {
    since: Option<String>,
    #[serde(rename = "type")]
    activity_type: Option<String>,
    user_id: Option<String>,
    status: Option<String>,
}

impl RecentParams {
    fn filters(self) -> ActivityLogParams {
        ActivityLogParams {
            limit: None,
            offset: None,
            activity_type: self.activity_type,
            user_id: self.user_id,
            status: self.status,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecentActivityLogsResponse {
    pub activities: Vec<ActivityLogRecord>,
}

/// Activity logs created after `since`, for background polling.
async fn list_recent_activity_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Result<Json<RecentActivityLogsResponse>> {
    let raw_since = params
        .since
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("'since' is required".to_string()))?;
    let since = parse_utc_rfc3339(raw_since).ok_or_else(|| {
        AppError::BadRequest("Invalid 'since' parameter: must be RFC3339 datetime".to_string())
    })?;
    let query = params.filters().into_query()?;

    let activities = state.db.list_activity_logs_since(&query, since).await?;
    Ok(Json(RecentActivityLogsResponse { activities }))
}

/// Assign a janitor to an activity log.
async fn assign_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssignTaskRequest>,
) -> Result<Json<ActivityLogRecord>> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    tracing::info!(
        activity_id = %request.activity_id,
        janitor_id = %request.janitor_id,
        "Assigning task"
    );

    let record = state.db.assign_task(&request).await?;
    Ok(Json(record))
}

// ─── Janitors ────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct JanitorsResponse {
    pub janitors: Vec<Janitor>,
}

async fn list_janitors(State(state): State<Arc<AppState>>) -> Result<Json<JanitorsResponse>> {
    let janitors = state.db.list_janitors().await?;
    Ok(Json(JanitorsResponse { janitors }))
}
