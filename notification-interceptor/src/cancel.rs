//! Cancelling notifications from outside the listener callback.
//!
//! Whoever owns the live listener connection implements
//! [`NotificationCanceller`]; automation actions receive it as a handle
//! instead of reaching for a global service instance.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Capability to cancel a posted notification by key
pub trait NotificationCanceller {
    /// Returns `true` when the notification was cancelled
    fn cancel_notification(&mut self, key: &str) -> bool;
}

/// Result reported back to the automation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub success: bool,
    pub message: String,
}

/// Run the cancel-notification action
pub fn run(canceller: &mut dyn NotificationCanceller, key: Option<&str>) -> CancelOutcome {
    let key = match key.map(str::trim) {
        Some(key) if !key.is_empty() => key,
        _ => {
            return CancelOutcome {
                success: false,
                message: "Missing required parameter: notification key is required".to_string(),
            }
        }
    };

    if canceller.cancel_notification(key) {
        info!("Notification {} canceled", key);
        CancelOutcome {
            success: true,
            message: "Notification canceled successfully".to_string(),
        }
    } else {
        warn!("Failed to cancel notification {}", key);
        CancelOutcome {
            success: false,
            message: "Failed to cancel notification. Make sure the notification service is enabled and has proper permissions.".to_string(),
        }
    }
}
