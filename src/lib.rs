// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! EcoBin field operations backend.
//!
//! Serves the bin-collection activity log and staff roster to the
//! dashboard, proxies routing requests to the Directions API, and provides
//! the client-side building blocks (cached activity feed, background sync,
//! arrival tracking) used by field devices.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::DirectionsClient;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub directions: DirectionsClient,
}
