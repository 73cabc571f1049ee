// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Activity logs (bin collection tasks)
//! - Janitors (field staff profiles)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    ActivityLogPage, ActivityLogQuery, ActivityLogRecord, AssignTaskRequest, Janitor,
};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, SubsecRound, Utc};
use firestore::select_filter_builder::FirestoreQueryFilterBuilder;
use firestore::FirestoreQueryFilter;
use serde::Deserialize;

/// Result row of the activity-log count aggregation.
#[derive(Deserialize)]
struct CountResult {
    total: u64,
}

/// Equality filters of an [`ActivityLogQuery`] plus an optional creation cursor.
struct ActivityLogFilter {
    activity_type: Option<String>,
    user_id: Option<String>,
    status: Option<&'static str>,
    created_after: Option<String>,
}

impl ActivityLogFilter {
    fn new(query: &ActivityLogQuery, created_after: Option<DateTime<Utc>>) -> Self {
        Self {
            activity_type: query.activity_type.clone(),
            user_id: query.user_id.clone(),
            status: query.status.map(|s| s.as_str()),
            // Stored timestamps are fixed-width strings, so string order is time order
            created_after: created_after.map(format_utc_rfc3339),
        }
    }

    fn build(&self, q: FirestoreQueryFilterBuilder) -> Option<FirestoreQueryFilter> {
        q.for_all([
            self.activity_type
                .as_deref()
                .and_then(|t| q.field("type").eq(t)),
            self.user_id.as_deref().and_then(|u| q.field("userId").eq(u)),
            self.status.and_then(|s| q.field("status").eq(s)),
            self.created_after
                .as_deref()
                .and_then(|c| q.field("createdAt").greater_than(c)),
        ])
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Activity Log Operations ─────────────────────────────────

    /// Get an activity log by ID.
    pub async fn get_activity_log(&self, id: &str) -> Result<Option<ActivityLogRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITY_LOGS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace an activity log.
    pub async fn set_activity_log(&self, record: &ActivityLogRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITY_LOGS)
            .document_id(&record.id)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get one page of activity logs, newest first, with the total match count.
    pub async fn list_activity_logs(
        &self,
        query: &ActivityLogQuery,
    ) -> Result<ActivityLogPage, AppError> {
        let client = self.get_client()?;
        let filter = ActivityLogFilter::new(query, None);

        let activities: Vec<ActivityLogRecord> = client
            .fluent()
            .select()
            .from(collections::ACTIVITY_LOGS)
            .filter(|q| filter.build(q))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .offset(query.offset)
            .limit(query.limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let counts: Vec<CountResult> = client
            .fluent()
            .select()
            .from(collections::ACTIVITY_LOGS)
            .filter(|q| filter.build(q))
            .aggregate(|a| a.fields([a.field("total").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let total_count = counts.first().map(|c| c.total).unwrap_or(0);

        Ok(ActivityLogPage {
            activities,
            total_count,
        })
    }

    /// Activity logs matching the query filters created strictly after `since`.
    pub async fn list_activity_logs_since(
        &self,
        query: &ActivityLogQuery,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityLogRecord>, AppError> {
        let filter = ActivityLogFilter::new(query, Some(since));

        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITY_LOGS)
            .filter(|q| filter.build(q))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Assign a janitor to an activity log and mark it in progress.
    pub async fn assign_task(
        &self,
        request: &AssignTaskRequest,
    ) -> Result<ActivityLogRecord, AppError> {
        let mut record = self
            .get_activity_log(&request.activity_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Activity log {} not found", request.activity_id))
            })?;

        request.to_patch().apply_to(&mut record);
        // Stored with microsecond precision
        record.updated_at = Utc::now().trunc_subsecs(6);

        self.set_activity_log(&record).await?;

        tracing::info!(
            activity_id = %record.id,
            janitor_id = %request.janitor_id,
            "Task assigned"
        );
        Ok(record)
    }

    /// Delete an activity log.
    pub async fn delete_activity_log(&self, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::ACTIVITY_LOGS)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Janitor Operations ──────────────────────────────────────

    /// List all janitors.
    pub async fn list_janitors(&self) -> Result<Vec<Janitor>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::JANITORS)
            .order_by([("fullName", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a janitor profile.
    pub async fn upsert_janitor(&self, janitor: &Janitor) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::JANITORS)
            .document_id(&janitor.id)
            .object(janitor)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
