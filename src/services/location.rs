// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device location access.
//!
//! The platform GPS layer is abstracted behind [`LocationProvider`] so the
//! tracker can run against real hardware bindings or a scripted feed.

use crate::error::AppError;
use crate::models::LocationPoint;
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Per-attempt timeout for one-shot position reads.
pub const DEFAULT_FIX_TIMEOUT: Duration = Duration::from_secs(10);

/// Buffer size of a position watch channel. Only the latest fix matters,
/// so a small buffer is enough.
const WATCH_BUFFER: usize = 16;

/// Requested GPS accuracy, in decreasing order of precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    High,
    Balanced,
    Low,
}

impl Accuracy {
    /// Order in which one-shot reads degrade after timeouts.
    pub const FALLBACK_ORDER: [Accuracy; 3] = [Accuracy::High, Accuracy::Balanced, Accuracy::Low];
}

/// Foreground location permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Errors reported by a location provider.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Timed out waiting for a position fix")]
    Timeout,

    #[error("Location services unavailable: {0}")]
    Unavailable(String),
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::PermissionDenied => AppError::PermissionDenied,
            other => AppError::LocationUnavailable(other.to_string()),
        }
    }
}

/// Platform location services.
pub trait LocationProvider: Send + Sync {
    /// Current permission state without prompting.
    fn permission_status(&self) -> BoxFuture<'_, PermissionStatus>;

    /// Prompt the user for permission.
    fn request_permission(&self) -> BoxFuture<'_, PermissionStatus>;

    /// Read a single position fix at the given accuracy.
    fn current_position(
        &self,
        accuracy: Accuracy,
    ) -> BoxFuture<'_, Result<LocationPoint, LocationError>>;

    /// Subscribe to continuous position updates.
    fn watch_position(&self, accuracy: Accuracy) -> Result<PositionWatch, LocationError>;
}

/// Receiving side of a position subscription.
pub struct PositionWatch {
    pub updates: mpsc::Receiver<LocationPoint>,
    pub subscription: WatchSubscription,
}

/// Handle that keeps a position subscription alive.
///
/// Cancelling (or dropping) flips a shared flag that the provider checks
/// before every delivery, so the provider stops as soon as `cancel` returns.
#[derive(Debug)]
pub struct WatchSubscription {
    active: Arc<AtomicBool>,
}

impl WatchSubscription {
    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Provider side of a position subscription.
#[derive(Clone, Debug)]
pub struct PositionSender {
    tx: mpsc::Sender<LocationPoint>,
    active: Arc<AtomicBool>,
}

impl PositionSender {
    /// Deliver a fix. Returns `false` once the subscriber has cancelled,
    /// which tells the provider to tear down its GPS listener.
    pub fn send(&self, point: LocationPoint) -> bool {
        if !self.is_subscribed() {
            return false;
        }
        match self.tx.try_send(point) {
            Ok(()) => true,
            // Subscriber is behind; dropping a stale fix is fine.
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.tx.is_closed()
    }
}

/// Create a linked sender/watch pair for provider implementations.
pub fn position_channel() -> (PositionSender, PositionWatch) {
    let (tx, updates) = mpsc::channel(WATCH_BUFFER);
    let active = Arc::new(AtomicBool::new(true));
    (
        PositionSender {
            tx,
            active: active.clone(),
        },
        PositionWatch {
            updates,
            subscription: WatchSubscription { active },
        },
    )
}

/// Make sure foreground permission is granted, prompting once if the user
/// has not decided yet. Denial is reported, never retried.
pub async fn ensure_permission(provider: &dyn LocationProvider) -> Result<(), AppError> {
    let status = match provider.permission_status().await {
        PermissionStatus::Undetermined => provider.request_permission().await,
        status => status,
    };

    match status {
        PermissionStatus::Granted => Ok(()),
        PermissionStatus::Denied | PermissionStatus::Undetermined => {
            tracing::warn!("Location permission denied");
            Err(AppError::PermissionDenied)
        }
    }
}

/// Read the current position, degrading accuracy on timeout.
///
/// Tries high, then balanced, then low accuracy. Each attempt is bounded by
/// `per_attempt`. Permission denial aborts immediately.
pub async fn locate(
    provider: &dyn LocationProvider,
    per_attempt: Duration,
) -> Result<LocationPoint, AppError> {
    ensure_permission(provider).await?;

    let mut last_error = LocationError::Timeout;
    for accuracy in Accuracy::FALLBACK_ORDER {
        match tokio::time::timeout(per_attempt, provider.current_position(accuracy)).await {
            Ok(Ok(point)) => {
                tracing::debug!(?accuracy, "Position fix acquired");
                return Ok(point);
            }
            Ok(Err(LocationError::PermissionDenied)) => return Err(AppError::PermissionDenied),
            Ok(Err(e)) => {
                tracing::warn!(?accuracy, error = %e, "Position read failed, degrading accuracy");
                last_error = e;
            }
            Err(_) => {
                tracing::warn!(?accuracy, "Position read timed out, degrading accuracy");
                last_error = LocationError::Timeout;
            }
        }
    }

    Err(AppError::LocationUnavailable(last_error.to_string()))
}
