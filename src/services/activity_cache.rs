// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Optimistic activity-log cache.
//!
//! Pages are cached per query signature for a short TTL. Local edits are
//! applied immediately and remembered as pending patches, which are
//! replayed over every fetched page until the server catches up.

use crate::error::{AppError, Result};
use crate::models::{
    ActivityLogPage, ActivityLogPatch, ActivityLogQuery, ActivityLogRecord, AssignTaskRequest,
};
use crate::services::activity_client::ActivityLogSource;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use validator::Validate;

/// How long a fetched page is served without going back to the server.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(120_000);

#[derive(Clone)]
struct CachedPage {
    page: ActivityLogPage,
    fetched_at: Instant,
    /// Bumped on every completed fetch, so waiters can tell a fetch landed.
    generation: u64,
}

/// Shared fetch locks, one per cache key.
type FetchLocks = DashMap<String, Arc<Mutex<()>>>;

/// TTL cache of activity-log pages with optimistic updates.
pub struct ActivityLogCache {
    source: Arc<dyn ActivityLogSource>,
    ttl: Duration,
    pages: DashMap<String, CachedPage>,
    /// Local edits not yet confirmed by a fetch, keyed by record ID.
    pending: DashMap<String, ActivityLogPatch>,
    fetch_locks: FetchLocks,
    generation: AtomicU64,
}

impl ActivityLogCache {
    pub fn new(source: Arc<dyn ActivityLogSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            pages: DashMap::new(),
            pending: DashMap::new(),
            fetch_locks: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // ─── Read Path ───────────────────────────────────────────────

    /// Get a page of activity logs.
    ///
    /// Serves from cache while the entry is younger than the TTL unless
    /// `force_refresh` is set. Only one network fetch per key runs at a time;
    /// callers that queued behind it reuse its result.
    pub async fn fetch(
        &self,
        query: &ActivityLogQuery,
        force_refresh: bool,
    ) -> Result<ActivityLogPage> {
        let key = query.cache_key();

        if !force_refresh {
            if let Some(page) = self.fresh_page(&key) {
                tracing::debug!(key = %key, "Activity log cache hit");
                return Ok(self.with_pending(page));
            }
        }

        let seen_generation = self.pages.get(&key).map(|e| e.generation);

        let lock = self
            .fetch_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // A fetch for this key may have completed while we waited.
        let landed = self
            .pages
            .get(&key)
            .map(|e| e.value().clone())
            .filter(|e| Some(e.generation) != seen_generation && self.is_young(e));
        if let Some(entry) = landed {
            tracing::debug!(key = %key, "Reusing concurrent activity log fetch");
            return Ok(self.with_pending(entry.page));
        }

        let mut page = match self.source.list(query).await {
            Ok(page) => page,
            Err(e) => {
                // Stale entry (if any) stays in place for display.
                tracing::warn!(key = %key, error = %e, "Activity log fetch failed");
                return Err(e);
            }
        };

        self.replay_pending(&mut page.activities);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.pages.insert(
            key.clone(),
            CachedPage {
                page: page.clone(),
                fetched_at: Instant::now(),
                generation,
            },
        );

        tracing::debug!(
            key = %key,
            count = page.activities.len(),
            total = page.total_count,
            "Activity log page fetched"
        );
        Ok(page)
    }

    /// Cached page for `query` with pending patches applied, fresh or not.
    pub fn cached(&self, query: &ActivityLogQuery) -> Option<ActivityLogPage> {
        let page = self.pages.get(&query.cache_key()).map(|e| e.page.clone())?;
        Some(self.with_pending(page))
    }

    /// Whether `query` can be served without a fetch.
    pub fn is_fresh(&self, query: &ActivityLogQuery) -> bool {
        self.fresh_page(&query.cache_key()).is_some()
    }

    /// Newest `created_at` in the cached page, used as the poll cursor.
    pub fn newest_created_at(&self, query: &ActivityLogQuery) -> Option<DateTime<Utc>> {
        self.pages
            .get(&query.cache_key())
            .and_then(|e| e.page.activities.iter().map(|r| r.created_at).max())
    }

    fn fresh_page(&self, key: &str) -> Option<ActivityLogPage> {
        self.pages
            .get(key)
            .filter(|e| self.is_young(e))
            .map(|e| e.page.clone())
    }

    fn is_young(&self, entry: &CachedPage) -> bool {
        entry.fetched_at.elapsed() < self.ttl
    }

    // ─── Optimistic Updates ──────────────────────────────────────

    /// Apply `patch` to the record locally before the server confirms it.
    ///
    /// Every cached copy of the record is updated in place and the patch is
    /// kept for replay over later fetches. Returns whether any cached copy
    /// was found.
    pub fn apply_local_update(&self, record_id: &str, patch: ActivityLogPatch) -> bool {
        let mut touched = false;
        for mut entry in self.pages.iter_mut() {
            for record in entry
                .page
                .activities
                .iter_mut()
                .filter(|r| r.id == record_id)
            {
                patch.apply_to(record);
                touched = true;
            }
        }

        self.pending
            .entry(record_id.to_string())
            .and_modify(|existing| existing.merge(patch.clone()))
            .or_insert(patch);

        tracing::debug!(record_id, touched, "Applied optimistic update");
        touched
    }

    /// Forget the pending patch for a record.
    ///
    /// Cached copies keep the patched values until the next fetch.
    pub fn revert(&self, record_id: &str) -> Option<ActivityLogPatch> {
        self.pending.remove(record_id).map(|(_, patch)| patch)
    }

    /// Number of local edits waiting for server confirmation.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop every cached page and pending patch.
    pub fn reset(&self) {
        self.pages.clear();
        self.pending.clear();
        tracing::info!("Activity log cache reset");
    }

    /// Replace cached copies of a record with the server's version.
    pub fn replace_record(&self, record: &ActivityLogRecord) {
        for mut entry in self.pages.iter_mut() {
            for cached in entry
                .page
                .activities
                .iter_mut()
                .filter(|r| r.id == record.id)
            {
                *cached = record.clone();
            }
        }

        let reflected = self
            .pending
            .get(&record.id)
            .is_some_and(|p| p.is_reflected_in(record));
        if reflected {
            self.pending.remove(&record.id);
        }
    }

    /// Assign a task optimistically.
    ///
    /// The assignment shows up in the cache immediately. If the server
    /// rejects it, the whole cache is discarded so the next fetch reloads
    /// authoritative state.
    pub async fn assign_task(&self, request: &AssignTaskRequest) -> Result<ActivityLogRecord> {
        request
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        self.apply_local_update(&request.activity_id, request.to_patch());

        match self.source.assign_task(request).await {
            Ok(record) => {
                self.replace_record(&record);
                tracing::info!(
                    activity_id = %request.activity_id,
                    janitor_id = %request.janitor_id,
                    "Task assigned"
                );
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(
                    activity_id = %request.activity_id,
                    error = %e,
                    "Task assignment failed, discarding optimistic state"
                );
                self.revert(&request.activity_id);
                self.reset();
                Err(e)
            }
        }
    }

    // ─── Reconciliation ──────────────────────────────────────────

    /// Prepend newly created records to the cached page for `query`.
    ///
    /// Records already present are skipped. Returns how many were added.
    pub fn splice_new(&self, query: &ActivityLogQuery, records: Vec<ActivityLogRecord>) -> usize {
        let Some(mut entry) = self.pages.get_mut(&query.cache_key()) else {
            return 0;
        };

        let mut fresh: Vec<ActivityLogRecord> = records
            .into_iter()
            .filter(|r| !entry.page.activities.iter().any(|c| c.id == r.id))
            .collect();
        fresh.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        fresh.dedup_by(|a, b| a.id == b.id);

        let added = fresh.len();
        if added > 0 {
            let page = &mut entry.page;
            page.total_count += added as u64;
            fresh.append(&mut page.activities);
            page.activities = fresh;
        }
        drop(entry);

        if added > 0 {
            tracing::debug!(added, "Spliced new activity logs");
        }
        added
    }

    /// Poll for records created after the newest cached one and splice them in.
    ///
    /// Only the first page (offset 0) receives new records.
    pub async fn poll_new(&self, query: &ActivityLogQuery) -> Result<usize> {
        if query.offset != 0 {
            return Ok(0);
        }
        let since = self
            .newest_created_at(query)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let records = self.source.list_since(query, since).await?;
        let records: Vec<ActivityLogRecord> = records
            .into_iter()
            .filter(|r| r.created_at > since && query.matches(r))
            .collect();

        Ok(self.splice_new(query, records))
    }

    /// Apply pending patches to a freshly fetched batch, dropping those the
    /// server already reflects.
    fn replay_pending(&self, records: &mut [ActivityLogRecord]) {
        for record in records.iter_mut() {
            let reflected = match self.pending.get(&record.id) {
                Some(patch) if patch.is_reflected_in(record) => true,
                Some(patch) => {
                    patch.apply_to(record);
                    false
                }
                None => continue,
            };
            if reflected {
                self.pending.remove(&record.id);
            }
        }
    }

    fn with_pending(&self, mut page: ActivityLogPage) -> ActivityLogPage {
        for record in page.activities.iter_mut() {
            if let Some(patch) = self.pending.get(&record.id) {
                patch.apply_to(record);
            }
        }
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityStatus;
    use futures_util::future::BoxFuture;
    use std::sync::atomic::AtomicUsize;

    /// Source that returns a fixed page and counts calls.
    struct FixedSource {
        page: ActivityLogPage,
        calls: AtomicUsize,
    }

    impl ActivityLogSource for FixedSource {
        fn list(&self, _query: &ActivityLogQuery) -> BoxFuture<'_, Result<ActivityLogPage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let page = self.page.clone();
            Box::pin(async move { Ok(page) })
        }

        fn list_since(
            &self,
            _query: &ActivityLogQuery,
            _since: DateTime<Utc>,
        ) -> BoxFuture<'_, Result<Vec<ActivityLogRecord>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn assign_task(
            &self,
            _request: &AssignTaskRequest,
        ) -> BoxFuture<'_, Result<ActivityLogRecord>> {
            Box::pin(async { Err(AppError::Upstream("not supported".to_string())) })
        }
    }

    fn record(id: &str) -> ActivityLogRecord {
        let now = Utc::now();
        ActivityLogRecord {
            id: id.to_string(),
            bin_id: format!("bin-{}", id),
            bin_location: "Lobby".to_string(),
            assigned_janitor_id: None,
            assigned_janitor_name: None,
            task_note: None,
            status: ActivityStatus::Pending,
            priority: Default::default(),
            activity_type: "collection".to_string(),
            user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn cache_with(records: Vec<ActivityLogRecord>) -> (ActivityLogCache, Arc<FixedSource>) {
        let total_count = records.len() as u64;
        let source = Arc::new(FixedSource {
            page: ActivityLogPage {
                activities: records,
                total_count,
            },
            calls: AtomicUsize::new(0),
        });
        (
            ActivityLogCache::new(source.clone(), DEFAULT_CACHE_TTL),
            source,
        )
    }

    #[tokio::test]
    async fn test_patch_reflected_by_server_is_dropped() {
        let mut done = record("a");
        done.status = ActivityStatus::InProgress;
        let (cache, _) = cache_with(vec![done]);

        cache.apply_local_update("a", ActivityLogPatch::status(ActivityStatus::InProgress));
        assert_eq!(cache.pending_count(), 1);

        cache
            .fetch(&ActivityLogQuery::default(), true)
            .await
            .unwrap();
        assert_eq!(cache.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_revert_forgets_patch() {
        let (cache, _) = cache_with(vec![record("a")]);
        cache.apply_local_update("a", ActivityLogPatch::status(ActivityStatus::Done));
        assert!(cache.revert("a").is_some());
        assert!(cache.revert("a").is_none());

        let page = cache
            .fetch(&ActivityLogQuery::default(), true)
            .await
            .unwrap();
        assert_eq!(page.activities[0].status, ActivityStatus::Pending);
    }

    #[tokio::test]
    async fn test_splice_skips_existing_and_counts() {
        let (cache, _) = cache_with(vec![record("a")]);
        let query = ActivityLogQuery::default();
        cache.fetch(&query, false).await.unwrap();

        let mut newer = record("b");
        newer.created_at += chrono::Duration::seconds(5);
        let added = cache.splice_new(&query, vec![record("a"), newer]);
        assert_eq!(added, 1);

        let page = cache.cached(&query).unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.activities[0].id, "b");
        assert_eq!(page.activities[1].id, "a");
    }

    #[tokio::test]
    async fn test_splice_without_cached_page_is_noop() {
        let (cache, _) = cache_with(vec![]);
        assert_eq!(
            cache.splice_new(&ActivityLogQuery::default(), vec![record("x")]),
            0
        );
    }

    #[tokio::test]
    async fn test_failed_assignment_resets_cache() {
        let (cache, source) = cache_with(vec![record("a")]);
        let query = ActivityLogQuery::default();
        cache.fetch(&query, false).await.unwrap();

        let request = AssignTaskRequest {
            activity_id: "a".to_string(),
            janitor_id: "j-1".to_string(),
            janitor_name: "Ana".to_string(),
            task_note: None,
        };
        assert!(cache.assign_task(&request).await.is_err());
        assert_eq!(cache.pending_count(), 0);
        assert!(cache.cached(&query).is_none());

        cache.fetch(&query, false).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_assignment_rejected_before_network() {
        let (cache, _) = cache_with(vec![record("a")]);
        let request = AssignTaskRequest {
            activity_id: "a".to_string(),
            janitor_id: String::new(),
            janitor_name: "Ana".to_string(),
            task_note: None,
        };
        let err = cache.assign_task(&request).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(cache.pending_count(), 0);
    }
}
