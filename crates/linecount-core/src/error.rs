// ── Core error types ──
//
// Domain errors from linecount-core. The HTTP layer maps the request-side
// variants onto 400/404 and everything else onto an opaque 500; the
// ingestion loop never lets any of them escape.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Request errors ───────────────────────────────────────────────
    /// Missing or malformed required fields.
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// A numeric argument was out of range (non-positive id or increment).
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Unknown device: '{code}'")]
    UnknownDevice { code: String },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    // ── Transport errors ─────────────────────────────────────────────
    /// A command could not be handed to the transport.
    #[error("Transport unavailable: {reason}")]
    TransportUnavailable { reason: String },

    // ── Storage errors ───────────────────────────────────────────────
    /// A table lacks a column the core cannot work without.
    #[error("Schema mismatch: table '{table}' has no column '{column}'")]
    SchemaMismatch { table: &'static str, column: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn session_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "session",
            identifier: id.to_string(),
        }
    }

    /// Returns `true` for errors caused by the caller's input rather than
    /// by the service itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest { .. }
                | Self::InvalidArgument { .. }
                | Self::UnknownDevice { .. }
                | Self::NotFound { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<linecount_transport::Error> for CoreError {
    fn from(err: linecount_transport::Error) -> Self {
        match err {
            linecount_transport::Error::InvalidTopic { topic, reason } => Self::BadRequest {
                message: format!("topic '{topic}': {reason}"),
            },
            linecount_transport::Error::InvalidConfig(message) => Self::Internal(message),
            other => Self::TransportUnavailable {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_side_errors_are_client_errors() {
        assert!(CoreError::bad_request("x").is_client_error());
        assert!(CoreError::invalid_argument("x").is_client_error());
        assert!(CoreError::session_not_found(9).is_client_error());
        assert!(
            CoreError::UnknownDevice {
                code: "DEV1".into()
            }
            .is_client_error()
        );
    }

    #[test]
    fn service_side_errors_are_not_client_errors() {
        assert!(!CoreError::Internal("boom".into()).is_client_error());
        assert!(
            !CoreError::TransportUnavailable {
                reason: "closed".into()
            }
            .is_client_error()
        );
    }

    #[test]
    fn closed_transport_maps_to_unavailable() {
        let err = CoreError::from(linecount_transport::Error::ChannelClosed);
        assert!(matches!(err, CoreError::TransportUnavailable { .. }));
    }
}
