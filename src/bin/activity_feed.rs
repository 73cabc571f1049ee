// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Headless activity feed.
//!
//! Runs the field app's cache and background sync against the API and logs
//! every change to the merged view. Useful for watching a deployment from
//! the command line.
//!
//! Optional filters come from `FEED_TYPE`, `FEED_USER_ID` and `FEED_STATUS`.

use ecobin_field::{
    config::Config,
    models::{ActivityLogQuery, ActivityStatus},
    services::{ActivityLogCache, ActivityLogClient, ActivityLogSync},
};
use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ecobin_field=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init();

    let config = Config::from_env()?;

    let status = env::var("FEED_STATUS")
        .ok()
        .map(|s| s.parse::<ActivityStatus>())
        .transpose()?;
    let query = ActivityLogQuery {
        activity_type: env::var("FEED_TYPE").ok(),
        user_id: env::var("FEED_USER_ID").ok(),
        status,
        ..ActivityLogQuery::default()
    };

    tracing::info!(
        api = %config.api_base_url,
        key = %query.cache_key(),
        "Starting activity feed"
    );

    let client = Arc::new(ActivityLogClient::new(config.api_base_url.clone()));
    let cache = Arc::new(ActivityLogCache::new(client, config.cache_ttl));
    let sync = ActivityLogSync::spawn(cache, query, config.sync_interval);

    let mut view = sync.view();
    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                match current.error {
                    Some(error) => tracing::warn!(
                        error = %error,
                        shown = current.activities.len(),
                        "Feed out of date"
                    ),
                    None => tracing::info!(
                        shown = current.activities.len(),
                        total = current.total_count,
                        newest = ?current.activities.first().map(|a| &a.id),
                        "Feed updated"
                    ),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    sync.shutdown().await;
    Ok(())
}
