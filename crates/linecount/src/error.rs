//! CLI error types with miette diagnostics.
//!
//! Maps core, config and HTTP client failures into user-facing errors with
//! help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use linecount_config::ConfigError;
use linecount_core::CoreError;

use crate::client::ClientError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const CONFIG: i32 = 78;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the control API at {url}")]
    #[diagnostic(
        code(linecount::connection_failed),
        help(
            "Check that `linecount serve` is running and reachable.\n\
             Set the address with --api-url or LINECOUNT_API_URL."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(linecount::bind),
        help("Another process may own the port. Change http.bind or pass --bind.")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MQTT transport unavailable: {reason}")]
    #[diagnostic(
        code(linecount::transport),
        help("Check the [mqtt] section of the configuration.")
    )]
    Transport { reason: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(
        code(linecount::not_found),
        help("Run: linecount {list_command} to see what exists")
    )]
    NotFound {
        message: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Request rejected: {message}")]
    #[diagnostic(code(linecount::rejected))]
    Rejected { message: String },

    #[error("Control API error (HTTP {status}): {message}")]
    #[diagnostic(code(linecount::api_error))]
    Api { status: u16, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(linecount::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(linecount::config),
        help("Inspect the effective settings with: linecount config show")
    )]
    Config(#[from] ConfigError),

    // ── Storage / internal ───────────────────────────────────────────

    #[error("{0}")]
    #[diagnostic(code(linecount::storage))]
    Storage(String),

    #[error("{0}")]
    #[diagnostic(code(linecount::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(linecount::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Transport { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Rejected { .. } => exit_code::USAGE,
            Self::Config(_) => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::TransportUnavailable { reason } => Self::Transport { reason },
            CoreError::NotFound { .. } => Self::NotFound {
                message: err.to_string(),
                list_command: "sessions list".into(),
            },
            CoreError::BadRequest { message } | CoreError::InvalidArgument { message } => {
                Self::Rejected { message }
            }
            CoreError::UnknownDevice { code } => Self::Validation {
                field: "device".into(),
                reason: format!("unknown device code '{code}'"),
            },
            CoreError::SchemaMismatch { .. } | CoreError::Storage(_) => {
                Self::Storage(err.to_string())
            }
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

// ── ClientError → CliError mapping ───────────────────────────────────

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidUrl { url, reason } => Self::Validation {
                field: format!("api-url '{url}'"),
                reason,
            },
            ClientError::Connection { url, source } => Self::ConnectionFailed {
                url,
                source: Box::new(source),
            },
            ClientError::Status {
                status: 404,
                message,
            } => Self::NotFound {
                message,
                list_command: "sessions list".into(),
            },
            ClientError::Status {
                status: 400,
                message,
            } => Self::Rejected { message },
            ClientError::Status { status, message } => Self::Api { status, message },
            ClientError::Decode { message } => Self::Internal(message),
        }
    }
}
