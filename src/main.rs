// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! EcoBin Field API Server
//!
//! Serves activity logs and the janitor roster to the dispatch dashboard
//! and proxies route requests for field navigation.

use ecobin_field::{
    config::Config, db::FirestoreDb, services::DirectionsClient, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting EcoBin Field API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    let directions = DirectionsClient::new(
        config.directions_base_url.clone(),
        config.google_maps_api_key.clone(),
    )?;
    tracing::info!(base_url = %config.directions_base_url, "Directions client initialized");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        directions,
    });

    // Build router
    let app = ecobin_field::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ecobin_field=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
