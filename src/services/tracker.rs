// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Arrival tracking for navigation sessions.
//!
//! [`ArrivalMonitor`] is the pure state machine (`Idle -> Tracking -> Arrived`);
//! [`ArrivalTracker`] drives it from a live position watch.

use crate::error::Result;
use crate::models::LocationPoint;
use crate::services::geodesy::haversine_distance;
use crate::services::location::{ensure_permission, Accuracy, LocationProvider, WatchSubscription};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Minimum change in distance before another spoken update is emitted.
pub const ANNOUNCEMENT_STEP_METERS: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackerState {
    #[default]
    Idle,
    Tracking,
    Arrived,
}

/// Events produced by a navigation session.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// Every accepted position update.
    DistanceUpdated {
        position: Option<LocationPoint>,
        distance_meters: f64,
    },
    /// Rate-limited update suitable for voice feedback.
    Announcement { distance_meters: f64 },
    /// Emitted once per session.
    Arrived { distance_meters: f64 },
    /// The provider closed the position watch; no further updates follow.
    WatchEnded,
}

/// Latest tracker state as seen by observers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackerSnapshot {
    pub state: TrackerState,
    pub position: Option<LocationPoint>,
    pub distance_meters: Option<f64>,
}

/// Distance-to-target state machine.
#[derive(Debug, Default)]
pub struct ArrivalMonitor {
    state: TrackerState,
    target: Option<LocationPoint>,
    threshold_meters: f64,
    last_position: Option<LocationPoint>,
    last_distance: Option<f64>,
    last_announced: Option<f64>,
}

impl ArrivalMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a session. Resets any previous session.
    pub fn start(&mut self, target: LocationPoint, threshold_meters: f64) {
        *self = Self {
            state: TrackerState::Tracking,
            target: Some(target),
            threshold_meters,
            ..Self::default()
        };
    }

    /// Return to idle. Safe to call in any state.
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            state: self.state,
            position: self.last_position,
            distance_meters: self.last_distance,
        }
    }

    /// Feed a position fix.
    pub fn on_position(&mut self, position: LocationPoint) -> Vec<TrackerEvent> {
        let Some(target) = self.target else {
            return Vec::new();
        };
        self.last_position = Some(position);
        self.record_distance(Some(position), haversine_distance(position, target))
    }

    /// Feed an already computed distance.
    pub fn on_distance(&mut self, distance_meters: f64) -> Vec<TrackerEvent> {
        if self.state == TrackerState::Idle {
            return Vec::new();
        }
        self.record_distance(None, distance_meters)
    }

    fn record_distance(
        &mut self,
        position: Option<LocationPoint>,
        distance_meters: f64,
    ) -> Vec<TrackerEvent> {
        if self.state == TrackerState::Idle {
            return Vec::new();
        }

        self.last_distance = Some(distance_meters);
        let mut events = vec![TrackerEvent::DistanceUpdated {
            position,
            distance_meters,
        }];

        let announce = self
            .last_announced
            .is_none_or(|last| (distance_meters - last).abs() > ANNOUNCEMENT_STEP_METERS);
        if announce {
            self.last_announced = Some(distance_meters);
            events.push(TrackerEvent::Announcement { distance_meters });
        }

        if self.state == TrackerState::Tracking && distance_meters <= self.threshold_meters {
            self.state = TrackerState::Arrived;
            events.push(TrackerEvent::Arrived { distance_meters });
        }

        events
    }
}

/// A running position subscription.
struct ActiveSession {
    subscription: WatchSubscription,
    task: JoinHandle<()>,
    snapshot: watch::Receiver<TrackerSnapshot>,
}

/// Drives an [`ArrivalMonitor`] from a location provider.
pub struct ArrivalTracker {
    provider: Arc<dyn LocationProvider>,
    accuracy: Accuracy,
    session: Option<ActiveSession>,
}

impl ArrivalTracker {
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self {
            provider,
            accuracy: Accuracy::High,
            session: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: Accuracy) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Start tracking distance to `target`.
    ///
    /// Fails with `PermissionDenied` if location access is refused; the
    /// caller decides whether to ask again.
    pub async fn start_tracking(
        &mut self,
        target: LocationPoint,
        threshold_meters: f64,
    ) -> Result<mpsc::UnboundedReceiver<TrackerEvent>> {
        self.stop_tracking();

        ensure_permission(self.provider.as_ref()).await?;
        let watch_handle = self.provider.watch_position(self.accuracy)?;

        let mut monitor = ArrivalMonitor::new();
        monitor.start(target, threshold_meters);

        let (snapshot_tx, snapshot_rx) = watch::channel(monitor.snapshot());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut updates = watch_handle.updates;

        let task = tokio::spawn(async move {
            while let Some(position) = updates.recv().await {
                let events = monitor.on_position(position);
                snapshot_tx.send_replace(monitor.snapshot());

                for event in events {
                    if let TrackerEvent::Arrived { distance_meters } = event {
                        tracing::info!(distance_meters, "Arrived at destination");
                    }
                    // Receiver may be gone; keep tracking state current anyway.
                    let _ = events_tx.send(event);
                }
            }

            // Keep the last fix for display but report that tracking is over
            snapshot_tx.send_replace(TrackerSnapshot {
                state: TrackerState::Idle,
                ..monitor.snapshot()
            });
            let _ = events_tx.send(TrackerEvent::WatchEnded);
            tracing::info!("Position watch ended by provider");
        });

        tracing::info!(
            latitude = target.latitude,
            longitude = target.longitude,
            threshold_meters,
            "Tracking started"
        );

        self.session = Some(ActiveSession {
            subscription: watch_handle.subscription,
            task,
            snapshot: snapshot_rx,
        });

        Ok(events_rx)
    }

    /// Stop tracking and release the position watch.
    ///
    /// The subscription is cancelled before this returns. Calling it when
    /// nothing is running does nothing.
    pub fn stop_tracking(&mut self) {
        if let Some(session) = self.session.take() {
            session.subscription.cancel();
            session.task.abort();
            tracing::info!("Tracking stopped");
        }
    }

    pub fn state(&self) -> TrackerState {
        self.snapshot().state
    }

    pub fn last_distance(&self) -> Option<f64> {
        self.snapshot().distance_meters
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.session
            .as_ref()
            .map(|s| *s.snapshot.borrow())
            .unwrap_or_default()
    }

    /// True while a session is running and its position watch is open.
    pub fn is_tracking(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.snapshot.borrow().state != TrackerState::Idle)
    }
}

impl Drop for ArrivalTracker {
    fn drop(&mut self) {
        self.stop_tracking();
    }
}
