// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, TimeZone, Utc};
use ecobin_field::config::Config;
use ecobin_field::db::FirestoreDb;
use ecobin_field::error::AppError;
use ecobin_field::models::{
    ActivityLogPage, ActivityLogQuery, ActivityLogRecord, ActivityStatus, AssignTaskRequest,
    Priority,
};
use ecobin_field::routes::create_router;
use ecobin_field::services::{ActivityLogSource, DirectionsClient};
use ecobin_field::AppState;
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let directions = DirectionsClient::new(
        config.directions_base_url.clone(),
        config.google_maps_api_key.clone(),
    )
    .unwrap();

    let state = Arc::new(AppState {
        config,
        db: test_db_offline(),
        directions,
    });

    (create_router(state.clone()), state)
}

/// Fixed timestamp `minutes` after a reference instant.
#[allow(dead_code)]
pub fn at_minute(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

/// Build an activity log record for tests.
#[allow(dead_code)]
pub fn test_record(id: &str, created_minute: i64) -> ActivityLogRecord {
    ActivityLogRecord {
        id: id.to_string(),
        bin_id: format!("bin-{}", id),
        bin_location: "North Gate".to_string(),
        assigned_janitor_id: None,
        assigned_janitor_name: None,
        task_note: None,
        status: ActivityStatus::Pending,
        priority: Priority::Medium,
        activity_type: "collection".to_string(),
        user_id: Some("user-1".to_string()),
        created_at: at_minute(created_minute),
        updated_at: at_minute(created_minute),
    }
}

#[allow(dead_code)]
pub fn assign_request(activity_id: &str, janitor_id: &str) -> AssignTaskRequest {
    AssignTaskRequest {
        activity_id: activity_id.to_string(),
        janitor_id: janitor_id.to_string(),
        janitor_name: "Dana Cruz".to_string(),
        task_note: Some("Overflowing".to_string()),
    }
}

/// In-memory activity-log backend that counts calls.
///
/// `list` returns the stored records newest first. When `apply_assignments`
/// is off, assignments are acknowledged but not stored, which models a
/// server whose read path lags behind its writes.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemorySource {
    pub records: Mutex<Vec<ActivityLogRecord>>,
    pub list_calls: AtomicUsize,
    pub since_calls: AtomicUsize,
    pub fail: AtomicBool,
    pub reject_assignments: AtomicBool,
    pub apply_assignments: AtomicBool,
    /// Artificial latency for `list`, to overlap concurrent fetches.
    pub list_delay: Mutex<Option<Duration>>,
}

#[allow(dead_code)]
impl MemorySource {
    pub fn with_records(records: Vec<ActivityLogRecord>) -> Arc<Self> {
        let source = Self::default();
        *source.records.lock().unwrap() = records;
        source.apply_assignments.store(true, Ordering::SeqCst);
        Arc::new(source)
    }

    pub fn push(&self, record: ActivityLogRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn matching(&self, query: &ActivityLogQuery) -> Vec<ActivityLogRecord> {
        let mut records: Vec<ActivityLogRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    fn check_failing(&self) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("connection refused".to_string()));
        }
        Ok(())
    }
}

impl ActivityLogSource for MemorySource {
    fn list(&self, query: &ActivityLogQuery) -> BoxFuture<'_, Result<ActivityLogPage, AppError>> {
        let query = query.clone();
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.list_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.check_failing()?;

            let all = self.matching(&query);
            let total_count = all.len() as u64;
            let activities = all
                .into_iter()
                .skip(query.offset as usize)
                .take(query.limit as usize)
                .collect();
            Ok(ActivityLogPage {
                activities,
                total_count,
            })
        })
    }

    fn list_since(
        &self,
        query: &ActivityLogQuery,
        since: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Vec<ActivityLogRecord>, AppError>> {
        let query = query.clone();
        Box::pin(async move {
            self.since_calls.fetch_add(1, Ordering::SeqCst);
            self.check_failing()?;
            Ok(self
                .matching(&query)
                .into_iter()
                .filter(|r| r.created_at > since)
                .collect())
        })
    }

    fn assign_task(
        &self,
        request: &AssignTaskRequest,
    ) -> BoxFuture<'_, Result<ActivityLogRecord, AppError>> {
        let request = request.clone();
        Box::pin(async move {
            self.check_failing()?;
            if self.reject_assignments.load(Ordering::SeqCst) {
                return Err(AppError::Upstream("HTTP 500".to_string()));
            }

            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|r| r.id == request.activity_id)
                .ok_or_else(|| AppError::NotFound(request.activity_id.clone()))?;

            let mut updated = record.clone();
            request.to_patch().apply_to(&mut updated);
            if self.apply_assignments.load(Ordering::SeqCst) {
                *record = updated.clone();
            }
            Ok(updated)
        })
    }
}
