// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity log (bin collection task) model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Task status for an activity log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pending",
            ActivityStatus::InProgress => "in_progress",
            ActivityStatus::Done => "done",
        }
    }
}

impl std::str::FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ActivityStatus::Pending),
            "in_progress" => Ok(ActivityStatus::InProgress),
            "done" => Ok(ActivityStatus::Done),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Bin urgency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Activity log stored in Firestore (`activitylogs/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogRecord {
    /// Server-assigned ID (also the document ID)
    pub id: String,
    pub bin_id: String,
    /// Human-readable bin location
    pub bin_location: String,
    pub assigned_janitor_id: Option<String>,
    pub assigned_janitor_name: Option<String>,
    pub task_note: Option<String>,
    #[serde(default)]
    pub status: ActivityStatus,
    #[serde(default)]
    pub priority: Priority,
    /// Kind of entry, e.g. "collection" or "maintenance"
    #[serde(rename = "type", default)]
    pub activity_type: String,
    /// User who created the entry
    pub user_id: Option<String>,
    /// Stored as fixed-width RFC3339 so Firestore orders it correctly
    #[serde(with = "crate::time_utils::rfc3339_micros")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time_utils::rfc3339_micros")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied optimistically on the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_janitor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_janitor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_note: Option<String>,
}

impl ActivityLogPatch {
    pub fn status(status: ActivityStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Overwrite the fields present in this patch.
    pub fn apply_to(&self, record: &mut ActivityLogRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(id) = &self.assigned_janitor_id {
            record.assigned_janitor_id = Some(id.clone());
        }
        if let Some(name) = &self.assigned_janitor_name {
            record.assigned_janitor_name = Some(name.clone());
        }
        if let Some(note) = &self.task_note {
            record.task_note = Some(note.clone());
        }
    }

    /// True when `record` already carries every field of this patch.
    pub fn is_reflected_in(&self, record: &ActivityLogRecord) -> bool {
        self.status.is_none_or(|s| record.status == s)
            && self.priority.is_none_or(|p| record.priority == p)
            && self
                .assigned_janitor_id
                .as_ref()
                .is_none_or(|id| record.assigned_janitor_id.as_ref() == Some(id))
            && self
                .assigned_janitor_name
                .as_ref()
                .is_none_or(|n| record.assigned_janitor_name.as_ref() == Some(n))
            && self
                .task_note
                .as_ref()
                .is_none_or(|n| record.task_note.as_ref() == Some(n))
    }

    /// Layer `newer` over this patch; newer fields win.
    pub fn merge(&mut self, newer: ActivityLogPatch) {
        if newer.status.is_some() {
            self.status = newer.status;
        }
        if newer.priority.is_some() {
            self.priority = newer.priority;
        }
        if newer.assigned_janitor_id.is_some() {
            self.assigned_janitor_id = newer.assigned_janitor_id;
        }
        if newer.assigned_janitor_name.is_some() {
            self.assigned_janitor_name = newer.assigned_janitor_name;
        }
        if newer.task_note.is_some() {
            self.task_note = newer.task_note;
        }
    }
}

/// One page of activity logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogPage {
    pub activities: Vec<ActivityLogRecord>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_count: u64,
}

/// Default page size for activity-log listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Query parameters of `GET /api/activitylogs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityLogQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivityStatus>,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Default for ActivityLogQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
            activity_type: None,
            user_id: None,
            status: None,
        }
    }
}

impl ActivityLogQuery {
    /// Deterministic cache slot for this query.
    ///
    /// Values are URL-encoded so no field can bleed into another.
    pub fn cache_key(&self) -> String {
        format!(
            "limit={}&offset={}&type={}&user_id={}&status={}",
            self.limit,
            self.offset,
            urlencoding::encode(self.activity_type.as_deref().unwrap_or("")),
            urlencoding::encode(self.user_id.as_deref().unwrap_or("")),
            self.status.map(|s| s.as_str()).unwrap_or(""),
        )
    }

    /// Whether a record belongs in this query's result set (ignoring paging).
    pub fn matches(&self, record: &ActivityLogRecord) -> bool {
        self.activity_type
            .as_ref()
            .is_none_or(|t| &record.activity_type == t)
            && self
                .user_id
                .as_ref()
                .is_none_or(|u| record.user_id.as_ref() == Some(u))
            && self.status.is_none_or(|s| record.status == s)
    }
}

/// Body of `POST /api/assign-task`.
#[derive(Debug, Clone, Serialize, Deserialize, validator::Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    #[validate(length(min = 1, message = "activityId is required"))]
    pub activity_id: String,
    #[validate(length(min = 1, message = "janitorId is required"))]
    pub janitor_id: String,
    #[validate(length(min = 1, max = 200))]
    pub janitor_name: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub task_note: Option<String>,
}

impl AssignTaskRequest {
    /// The optimistic patch a successful assignment will produce.
    pub fn to_patch(&self) -> ActivityLogPatch {
        ActivityLogPatch {
            status: Some(ActivityStatus::InProgress),
            priority: None,
            assigned_janitor_id: Some(self.janitor_id.clone()),
            assigned_janitor_name: Some(self.janitor_name.clone()),
            task_note: self.task_note.clone(),
        }
    }
}
