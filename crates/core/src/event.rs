use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Kind tag carried by every [`Notification`].
pub const NOTIFICATIONS_KIND: &str = "Notifications";

/// A `Notifications` event handed to an [`EventPublisher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: String,
    pub payload: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: NOTIFICATIONS_KIND.to_string(),
            payload: payload.into(),
            at: Utc::now(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Capability for delivering events to interested listeners.
///
/// Delivery is fire-and-forget: the only thing a caller learns is whether the
/// publisher accepted the event.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: Notification) -> Result<(), PublishError>;
}

/// Failures reported by publishers backed by an external transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("event publisher is closed")]
    Closed,
}
