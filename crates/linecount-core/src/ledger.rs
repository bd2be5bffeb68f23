// ── Telemetry ledger ──
//
// Append-only record of per-session counter increments. The HTTP path and
// the MQTT ingestion path both come through `append`, so there is one
// definition of what a valid increment is.

use std::sync::Arc;

use chrono::Utc;

use crate::directory::DeviceDirectory;
use crate::error::CoreError;
use crate::model::{NewReading, Reading, ReadingSample, SessionId};
use crate::store::Store;
use crate::store::readings::ReadingRow;

pub struct TelemetryLedger {
    store: Store,
    directory: Arc<DeviceDirectory>,
}

impl TelemetryLedger {
    pub fn new(store: Store, directory: Arc<DeviceDirectory>) -> Self {
        Self { store, directory }
    }

    /// Validate and write one increment.
    ///
    /// Checks run in order: positive session id and increment
    /// (`InvalidArgument`), session exists (`NotFound`), device code known
    /// (`UnknownDevice`). Nothing is written unless all pass. The session's
    /// status is not consulted.
    pub fn append(&self, reading: &NewReading) -> Result<Reading, CoreError> {
        if !reading.session_id.is_valid() || reading.increment <= 0 {
            return Err(CoreError::invalid_argument(format!(
                "session id and increment must be > 0 (got session {}, increment {})",
                reading.session_id, reading.increment
            )));
        }
        if !self.store.session_exists(reading.session_id)? {
            return Err(CoreError::session_not_found(reading.session_id));
        }

        let device_code = reading.device_code.trim();
        let device_id = self.directory.resolve(device_code)?;
        let timestamp = reading.timestamp.unwrap_or_else(Utc::now);

        let id = self.store.insert_reading(&ReadingRow {
            session_id: reading.session_id,
            device_id,
            device_code,
            timestamp,
            increment: reading.increment,
            temperature_c: reading.temperature_c,
        })?;

        tracing::debug!(
            reading_id = %id,
            session_id = %reading.session_id,
            device = device_code,
            increment = reading.increment,
            "reading appended"
        );

        Ok(Reading {
            id,
            session_id: reading.session_id,
            device_id,
            timestamp,
            increment: reading.increment,
            temperature_c: reading.temperature_c,
        })
    }

    /// Sum of all accepted increments for the session.
    pub fn aggregate_total(&self, session_id: SessionId) -> Result<i64, CoreError> {
        self.store.session_total(session_id)
    }

    /// The newest `limit` readings, newest first.
    pub fn recent(&self, session_id: SessionId, limit: usize) -> Result<Vec<ReadingSample>, CoreError> {
        self.store.recent_readings(session_id, limit)
    }
}
