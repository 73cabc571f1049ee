// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Location and route models for navigation.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Format as `lat,lng` for the Directions API.
    pub fn to_query_value(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }

    /// Parse a `lat,lng` pair, rejecting out-of-range values.
    pub fn parse_query_value(raw: &str) -> Option<Self> {
        let (lat, lng) = raw.split_once(',')?;
        let latitude: f64 = lat.trim().parse().ok()?;
        let longitude: f64 = lng.trim().parse().ok()?;
        let point = Self::new(latitude, longitude);
        point.is_valid().then_some(point)
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<geo::Coord<f64>> for LocationPoint {
    fn from(c: geo::Coord<f64>) -> Self {
        Self::new(c.y, c.x)
    }
}

impl From<LocationPoint> for geo::Coord<f64> {
    fn from(p: LocationPoint) -> Self {
        geo::coord! { x: p.longitude, y: p.latitude }
    }
}

/// Travel mode understood by the Directions API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Transit,
    Bicycling,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Transit => "transit",
            TravelMode::Bicycling => "bicycling",
        }
    }

    /// Average speed used for straight-line duration estimates (m/s).
    pub fn fallback_speed_mps(&self) -> f64 {
        match self {
            TravelMode::Walking => 1.4,
            TravelMode::Bicycling => 4.2,
            TravelMode::Driving | TravelMode::Transit => 13.9,
        }
    }
}

/// Where a route's geometry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    Directions,
    StraightLine,
}

/// Route returned to navigation screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub success: bool,
    pub coordinates: Vec<LocationPoint>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub duration_label: String,
    pub source: RouteSource,
    /// Why the straight-line fallback was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl RouteResult {
    pub fn is_fallback(&self) -> bool {
        self.source == RouteSource::StraightLine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_value() {
        let p = LocationPoint::parse_query_value("14.5995, 120.9842").unwrap();
        assert_eq!(p, LocationPoint::new(14.5995, 120.9842));
        assert_eq!(p.to_query_value(), "14.5995,120.9842");
    }

    #[test]
    fn test_parse_query_value_rejects_bad_input() {
        assert!(LocationPoint::parse_query_value("14.5").is_none());
        assert!(LocationPoint::parse_query_value("abc,def").is_none());
        assert!(LocationPoint::parse_query_value("91.0,0.0").is_none());
        assert!(LocationPoint::parse_query_value("0.0,181.0").is_none());
    }

    #[test]
    fn test_geo_coord_axis_order() {
        let c: geo::Coord<f64> = LocationPoint::new(10.0, 20.0).into();
        assert_eq!(c.x, 20.0);
        assert_eq!(c.y, 10.0);
        assert_eq!(LocationPoint::from(c), LocationPoint::new(10.0, 20.0));
    }

    #[test]
    fn test_travel_mode_wire_names() {
        let mode: TravelMode = serde_json::from_str("\"bicycling\"").unwrap();
        assert_eq!(mode, TravelMode::Bicycling);
        assert_eq!(mode.as_str(), "bicycling");
        assert_eq!(TravelMode::Transit.fallback_speed_mps(), 13.9);
    }
}
