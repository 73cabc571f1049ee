// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity_cache;
pub mod activity_client;
pub mod activity_sync;
pub mod directions;
pub mod geodesy;
pub mod location;
pub mod tracker;

pub use activity_cache::ActivityLogCache;
pub use activity_client::{ActivityLogClient, ActivityLogSource};
pub use activity_sync::{ActivityLogSync, ActivityLogView, SyncSignal};
pub use directions::DirectionsClient;
pub use location::{
    position_channel, Accuracy, LocationError, LocationProvider, PermissionStatus, PositionSender,
    PositionWatch, WatchSubscription,
};
pub use tracker::{ArrivalMonitor, ArrivalTracker, TrackerEvent, TrackerSnapshot, TrackerState};
