// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Directions API client.
//!
//! Routing never fails outright: any provider problem degrades to a
//! straight-line route between the two points.

use crate::error::AppError;
use crate::models::{LocationPoint, RouteResult, RouteSource, TravelMode};
use crate::services::geodesy::{
    decode_polyline, estimate_duration_seconds, format_duration_label, haversine_distance,
};
use serde::Deserialize;
use std::time::Duration;

/// Upper bound on a directions request before falling back.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Directions API client.
#[derive(Clone)]
pub struct DirectionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DirectionsClient {
    /// Create a client. `base_url` is the Maps API root, without `/directions/json`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Directions(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Get a route between two points, falling back to a straight line on
    /// any provider failure.
    pub async fn get_route(
        &self,
        origin: LocationPoint,
        destination: LocationPoint,
        mode: TravelMode,
    ) -> RouteResult {
        match self.fetch_route(origin, destination, mode).await {
            Ok(route) => route,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    mode = mode.as_str(),
                    "Directions unavailable, using straight-line route"
                );
                straight_line_route(origin, destination, mode, Some(e.to_string()))
            }
        }
    }

    /// Call the provider without fallback.
    pub async fn fetch_route(
        &self,
        origin: LocationPoint,
        destination: LocationPoint,
        mode: TravelMode,
    ) -> Result<RouteResult, AppError> {
        let url = format!("{}/directions/json", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("origin", origin.to_query_value()),
                ("destination", destination.to_query_value()),
                ("mode", mode.as_str().to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            // The request URL carries the API key
            .map_err(|e| AppError::Directions(format!("Request failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(AppError::Directions(format!("HTTP {}", response.status())));
        }

        let body: DirectionsResponse = response
            .json()
            .await
            .map_err(|e| {
                AppError::Directions(format!("JSON parse error: {}", e.without_url()))
            })?;

        route_from_response(body)
    }
}

/// Convert a provider response into a route, or explain why it can't be used.
pub fn route_from_response(body: DirectionsResponse) -> Result<RouteResult, AppError> {
    if body.status != "OK" {
        let detail = body
            .error_message
            .map(|m| format!("{}: {}", body.status, m))
            .unwrap_or(body.status);
        return Err(AppError::Directions(detail));
    }

    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Directions("No routes returned".to_string()))?;

    let coordinates = decode_polyline(&route.overview_polyline.points)
        .map_err(|e| AppError::Directions(e.to_string()))?;
    if coordinates.len() < 2 {
        return Err(AppError::Directions("Route polyline too short".to_string()));
    }

    let distance_meters: f64 = route.legs.iter().map(|l| l.distance.value).sum();
    let duration_seconds: f64 = route.legs.iter().map(|l| l.duration.value).sum();
    // Single-leg routes carry a provider-formatted label; keep it.
    let duration_label = match route.legs.as_slice() {
        [leg] => leg.duration.text.clone(),
        _ => format_duration_label(duration_seconds),
    };

    Ok(RouteResult {
        success: true,
        coordinates,
        distance_meters,
        duration_seconds,
        duration_label,
        source: RouteSource::Directions,
        error_reason: None,
    })
}

/// Two-point route using great-circle distance and a mode-based speed.
pub fn straight_line_route(
    origin: LocationPoint,
    destination: LocationPoint,
    mode: TravelMode,
    error_reason: Option<String>,
) -> RouteResult {
    let distance_meters = haversine_distance(origin, destination);
    let duration_seconds = estimate_duration_seconds(distance_meters, mode);
    RouteResult {
        success: true,
        coordinates: vec![origin, destination],
        distance_meters,
        duration_seconds,
        duration_label: format_duration_label(duration_seconds),
        source: RouteSource::StraightLine,
        error_reason,
    }
}

/// Directions API response (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsResponse {
    pub status: String,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsRoute {
    #[serde(default)]
    pub legs: Vec<DirectionsLeg>,
    pub overview_polyline: OverviewPolyline,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsLeg {
    pub distance: TextValue,
    pub duration: TextValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    pub value: f64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverviewPolyline {
    pub points: String,
}
