// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Distance math and polyline coding for navigation.

use crate::models::{LocationPoint, TravelMode};

/// Spherical Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Google polyline precision (1e5 fixed point).
const POLYLINE_PRECISION: u32 = 5;

/// Great-circle distance in meters between two points.
///
/// Treats the Earth as a sphere, which is accurate enough at city scale.
pub fn haversine_distance(a: LocationPoint, b: LocationPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Total length of a path in meters.
pub fn path_length(points: &[LocationPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(w[0], w[1]))
        .sum()
}

/// Decode a Google encoded polyline (precision 5).
pub fn decode_polyline(encoded: &str) -> Result<Vec<LocationPoint>, GeoError> {
    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|e| GeoError::Polyline(e.to_string()))?;
    Ok(line.0.into_iter().map(LocationPoint::from).collect())
}

/// Encode points as a Google polyline (precision 5).
pub fn encode_polyline(points: &[LocationPoint]) -> Result<String, GeoError> {
    polyline::encode_coordinates(points.iter().map(|p| geo::Coord::from(*p)), POLYLINE_PRECISION)
        .map_err(|e| GeoError::Polyline(e.to_string()))
}

/// Travel time estimate for a straight-line route.
pub fn estimate_duration_seconds(distance_meters: f64, mode: TravelMode) -> f64 {
    distance_meters / mode.fallback_speed_mps()
}

/// Human-readable duration, e.g. "7 min" or "1 h 5 min".
pub fn format_duration_label(seconds: f64) -> String {
    let minutes = (seconds / 60.0).round().max(1.0) as u64;
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{} h {} min", minutes / 60, minutes % 60)
    }
}

/// Errors from geometry operations.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Failed to code polyline: {0}")]
    Polyline(String),
}
