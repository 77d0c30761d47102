//! The shared envelope carried by every control message.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::layout::InstanceId;

/// Milliseconds since the Unix epoch.
pub type EpochMillis = u64;

pub fn now_epoch_millis() -> EpochMillis {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Identity and timing metadata attached to every control message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub timestamp: EpochMillis,
    pub source: InstanceId,
}

impl Envelope {
    pub fn new(source: InstanceId) -> Self {
        Self { id: Uuid::new_v4(), timestamp: now_epoch_millis(), source }
    }
}
