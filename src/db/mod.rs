//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    /// Bin collection tasks (keyed by activity log ID)
    pub const ACTIVITY_LOGS: &str = "activitylogs";
    pub const JANITORS: &str = "janitors";
}
