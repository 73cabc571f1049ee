// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background reconciliation for the activity-log cache.
//!
//! A single task per watched query:
//! 1. Loads the page on start
//! 2. On every tick, re-fetches if the page expired, otherwise polls for
//!    newly created records and splices them in
//! 3. Handles out-of-band refresh signals from other components
//! 4. Publishes the merged view for observers

use crate::models::{ActivityLogQuery, ActivityLogRecord};
use crate::services::activity_cache::ActivityLogCache;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Polling never runs more often than this, whatever is configured.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(2);

const SIGNAL_BUFFER: usize = 8;

/// Messages other components send to the sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSignal {
    /// Data changed elsewhere (e.g. a companion mobile session); refetch now.
    RefreshNow,
    /// Stop the loop.
    Shutdown,
}

/// What the UI renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityLogView {
    pub activities: Vec<ActivityLogRecord>,
    pub total_count: u64,
    /// Last sync error; previous data stays visible.
    pub error: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Handle to a running sync loop.
pub struct ActivityLogSync {
    signals: mpsc::Sender<SyncSignal>,
    view: watch::Receiver<ActivityLogView>,
    task: JoinHandle<()>,
}

impl ActivityLogSync {
    /// Start syncing `query`. `interval` is clamped to [`MIN_SYNC_INTERVAL`].
    pub fn spawn(cache: Arc<ActivityLogCache>, query: ActivityLogQuery, interval: Duration) -> Self {
        let interval = interval.max(MIN_SYNC_INTERVAL);
        let (signals, signal_rx) = mpsc::channel(SIGNAL_BUFFER);
        let (view_tx, view) = watch::channel(ActivityLogView::default());

        let worker = SyncWorker {
            cache,
            query,
            view: view_tx,
        };
        let task = tokio::spawn(worker.run(interval, signal_rx));

        Self {
            signals,
            view,
            task,
        }
    }

    /// Sender for other components that need to trigger a refresh.
    pub fn signals(&self) -> mpsc::Sender<SyncSignal> {
        self.signals.clone()
    }

    /// Observe the merged view.
    pub fn view(&self) -> watch::Receiver<ActivityLogView> {
        self.view.clone()
    }

    /// Ask for an immediate out-of-band refresh.
    pub async fn refresh_now(&self) {
        if self.signals.send(SyncSignal::RefreshNow).await.is_err() {
            tracing::debug!("Sync loop already stopped");
        }
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.signals.send(SyncSignal::Shutdown).await;
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Sync task ended abnormally");
        }
    }
}

struct SyncWorker {
    cache: Arc<ActivityLogCache>,
    query: ActivityLogQuery,
    view: watch::Sender<ActivityLogView>,
}

impl SyncWorker {
    async fn run(self, interval: Duration, mut signals: mpsc::Receiver<SyncSignal>) {
        tracing::info!(
            key = %self.query.cache_key(),
            interval_ms = interval.as_millis() as u64,
            "Activity log sync started"
        );

        self.refresh(false).await;

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll().await,
                signal = signals.recv() => match signal {
                    Some(SyncSignal::RefreshNow) => {
                        tracing::debug!("Out-of-band refresh requested");
                        self.refresh(true).await;
                    }
                    Some(SyncSignal::Shutdown) | None => break,
                },
            }
        }

        tracing::info!("Activity log sync stopped");
    }

    async fn poll(&self) {
        if !self.cache.is_fresh(&self.query) {
            self.refresh(false).await;
            return;
        }

        match self.cache.poll_new(&self.query).await {
            Ok(0) => self.publish_recovered(),
            Ok(added) => {
                tracing::info!(added, "New activity logs picked up");
                self.publish_cached();
            }
            Err(e) => self.publish_error(e.to_string()),
        }
    }

    async fn refresh(&self, force: bool) {
        match self.cache.fetch(&self.query, force).await {
            Ok(_) => self.publish_cached(),
            Err(e) => self.publish_error(e.to_string()),
        }
    }

    fn publish_cached(&self) {
        let Some(page) = self.cache.cached(&self.query) else {
            return;
        };
        self.view.send_replace(ActivityLogView {
            activities: page.activities,
            total_count: page.total_count,
            error: None,
            last_synced_at: Some(Utc::now()),
        });
    }

    /// A successful tick with nothing new: clear any earlier error.
    /// Observers are only woken when there was one.
    fn publish_recovered(&self) {
        self.view.send_if_modified(|view| {
            view.last_synced_at = Some(Utc::now());
            view.error.take().is_some()
        });
    }

    fn publish_error(&self, error: String) {
        tracing::warn!(error = %error, "Activity log sync failed");
        self.view.send_modify(|view| view.error = Some(error));
    }
}
