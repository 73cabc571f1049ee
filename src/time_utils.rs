// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with microseconds and a `Z` suffix.
///
/// Microseconds keep `since` cursors from skipping records created within
/// the same second.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC3339 timestamp into UTC.
pub fn parse_utc_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Serde adapter storing timestamps in the fixed-width
/// [`format_utc_rfc3339`] form, so stored strings sort chronologically.
///
/// Use with `#[serde(with = "crate::time_utils::rfc3339_micros")]`.
pub mod rfc3339_micros {
    use super::{format_utc_rfc3339, parse_utc_rfc3339};
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_utc_rfc3339(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_utc_rfc3339(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid RFC3339 timestamp: {}", raw)))
    }
}
