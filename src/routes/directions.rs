// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Directions proxy: keeps the Maps API key on the server.

use crate::error::{AppError, Result};
use crate::models::{LocationPoint, RouteResult, TravelMode};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/directions", get(get_directions))
}

#[derive(Deserialize)]
struct DirectionsParams {
    origin: Option<String>,
    destination: Option<String>,
    mode: Option<String>,
}

fn parse_point(name: &str, raw: Option<&str>) -> Result<LocationPoint> {
    let raw = raw.ok_or_else(|| AppError::BadRequest(format!("'{}' is required", name)))?;
    LocationPoint::parse_query_value(raw).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid '{}': expected 'lat,lng' within valid ranges",
            name
        ))
    })
}

fn parse_mode(raw: Option<&str>) -> Result<TravelMode> {
    match raw.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(TravelMode::default()),
        Some("driving") => Ok(TravelMode::Driving),
        Some("walking") => Ok(TravelMode::Walking),
        Some("transit") => Ok(TravelMode::Transit),
        Some("bicycling") => Ok(TravelMode::Bicycling),
        Some(other) => Err(AppError::BadRequest(format!(
            "Invalid 'mode': {}",
            other
        ))),
    }
}

/// Route between two points; degrades to a straight line when the provider fails.
async fn get_directions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DirectionsParams>,
) -> Result<Json<RouteResult>> {
    let origin = parse_point("origin", params.origin.as_deref())?;
    let destination = parse_point("destination", params.destination.as_deref())?;
    let mode = parse_mode(params.mode.as_deref())?;

    let route = state.directions.get_route(origin, destination, mode).await;

    tracing::debug!(
        mode = mode.as_str(),
        fallback = route.is_fallback(),
        distance_meters = route.distance_meters,
        "Route computed"
    );

    Ok(Json(route))
}
