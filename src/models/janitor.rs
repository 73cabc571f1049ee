// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Janitor (field staff) model.

use crate::models::LocationPoint;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Availability of a janitor for new tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum JanitorStatus {
    Available,
    Busy,
    #[default]
    Offline,
}

/// Janitor profile stored in Firestore (`janitors/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Janitor {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub status: JanitorStatus,
    /// Last reported position, if the field app has shared one
    #[serde(default)]
    pub location: Option<LocationPoint>,
}

impl Janitor {
    pub fn is_assignable(&self) -> bool {
        self.status == JanitorStatus::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_status_defaults_to_offline() {
        let j: Janitor = serde_json::from_str(r#"{"id":"j1","fullName":"Ana Cruz"}"#).unwrap();
        assert_eq!(j.status, JanitorStatus::Offline);
        assert!(!j.is_assignable());
        assert!(j.location.is_none());
    }
}
