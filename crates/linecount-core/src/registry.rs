// ── Session registry ──
//
// Lifecycle of production sessions. Creating a session tells the device to
// start counting; finalizing tells it to stop. The command is a side effect
// of the state change, never a precondition for it: the row is written
// first and a failed publish is reported alongside the result.

use std::sync::Arc;

use chrono::Utc;

use crate::command::{CommandPublisher, DeviceCommand};
use crate::directory::DeviceDirectory;
use crate::error::CoreError;
use crate::model::{NewSession, Session, SessionId, normalize_lot};
use crate::store::Store;
use crate::store::sessions::SessionRow;

/// Result of a lifecycle change plus what happened to the device command.
#[derive(Debug)]
pub struct Transition {
    pub session_id: SessionId,
    /// `Err` when the command never reached the transport queue.
    pub command: Result<(), CoreError>,
}

impl Transition {
    pub fn command_delivered(&self) -> bool {
        self.command.is_ok()
    }
}

pub struct SessionRegistry {
    store: Store,
    directory: Arc<DeviceDirectory>,
    publisher: CommandPublisher,
}

impl SessionRegistry {
    pub fn new(store: Store, directory: Arc<DeviceDirectory>, publisher: CommandPublisher) -> Self {
        Self {
            store,
            directory,
            publisher,
        }
    }

    /// Open a new active session and send `start` to its device.
    ///
    /// The device code must resolve; nothing is written otherwise.
    pub fn create(&self, new: &NewSession) -> Result<Transition, CoreError> {
        let device_code = new.device_code.trim();
        self.directory.resolve(device_code)?;

        let lot = normalize_lot(new.lot.as_deref());
        let session_id = self.store.insert_session(&SessionRow {
            client_id: new.client_id,
            product_id: new.product_id,
            lot: &lot,
            operator_id: new.operator_id,
            started_at: Utc::now(),
        })?;

        tracing::info!(
            %session_id,
            device = device_code,
            client_id = new.client_id,
            product_id = new.product_id,
            lot = %lot,
            "session created"
        );

        let command = self.publish(device_code, DeviceCommand::start(session_id));
        Ok(Transition {
            session_id,
            command,
        })
    }

    /// Mark a session finalized and send `stop` to the given device.
    ///
    /// The update is unconditional: an unknown id changes nothing and a
    /// finalized session gets a new end time. The stop command goes out
    /// in both cases. A blank device code is rejected before any write.
    pub fn finalize(&self, session_id: SessionId, device_code: &str) -> Result<Transition, CoreError> {
        let device_code = device_code.trim();
        if device_code.is_empty() {
            return Err(CoreError::bad_request("dispositivo_codigo is required"));
        }

        let touched = self.store.finalize_session(session_id, Utc::now())?;
        if touched == 0 {
            tracing::debug!(%session_id, "finalize matched no session");
        } else {
            tracing::info!(%session_id, device = device_code, "session finalized");
        }

        let command = self.publish(device_code, DeviceCommand::stop(session_id));
        Ok(Transition {
            session_id,
            command,
        })
    }

    /// Fetch a session row.
    pub fn fetch(&self, session_id: SessionId) -> Result<Session, CoreError> {
        self.store
            .session(session_id)?
            .ok_or_else(|| CoreError::session_not_found(session_id))
    }

    pub fn exists(&self, session_id: SessionId) -> Result<bool, CoreError> {
        self.store.session_exists(session_id)
    }

    fn publish(&self, device_code: &str, command: DeviceCommand) -> Result<(), CoreError> {
        let result = self.publisher.send(device_code, &command);
        if let Err(ref e) = result {
            tracing::warn!(
                device = device_code,
                action = %command.action(),
                error = %e,
                "device command not sent"
            );
        }
        result
    }
}
