use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DeviceId, ReadingId, SessionId};

/// An increment to be appended to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub session_id: SessionId,
    pub device_code: String,
    pub increment: i64,
    /// Event time reported by the device; `None` means "now".
    pub timestamp: Option<DateTime<Utc>>,
    pub temperature_c: Option<f64>,
}

impl NewReading {
    pub fn new(session_id: SessionId, device_code: impl Into<String>, increment: i64) -> Self {
        Self {
            session_id,
            device_code: device_code.into(),
            increment,
            timestamp: None,
            temperature_c: None,
        }
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature_c: Option<f64>) -> Self {
        self.temperature_c = temperature_c;
        self
    }
}

/// An accepted, immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: ReadingId,
    pub session_id: SessionId,
    pub device_id: DeviceId,
    pub timestamp: DateTime<Utc>,
    pub increment: i64,
    pub temperature_c: Option<f64>,
}

/// The slice of a reading shown in session detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingSample {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "contagem_incremental")]
    pub increment: i64,
}
