// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity_log;
pub mod janitor;
pub mod location;

pub use activity_log::{
    ActivityLogPage, ActivityLogPatch, ActivityLogQuery, ActivityLogRecord, ActivityStatus,
    AssignTaskRequest, Priority,
};
pub use janitor::{Janitor, JanitorStatus};
pub use location::{LocationPoint, RouteResult, RouteSource, TravelMode};
