use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ClassifiedOffer;
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }
}

/// Periodic liveness summary sent while the loop keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatStats {
    pub last_found: DateTime<Utc>,
    pub active_model_count: usize,
    pub catalog_size: usize,
    pub seen_count: usize,
}

/// Downstream channel for qualified offers and health signals.
///
/// Delivery failures come back as `AppError::NotifyFailed`; callers count
/// them and carry on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, offer: &ClassifiedOffer) -> Result<NotificationResult>;

    async fn alert(&self, message: &str) -> Result<NotificationResult>;

    async fn heartbeat(&self, stats: &HeartbeatStats) -> Result<NotificationResult>;
}
