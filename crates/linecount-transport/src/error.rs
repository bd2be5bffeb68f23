use thiserror::Error;

/// Top-level error type for the `linecount-transport` crate.
///
/// Covers broker connectivity, client request queueing, and topic shape
/// validation. `linecount-core` maps these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Broker ──────────────────────────────────────────────────────
    /// The MQTT event loop lost (or never established) its connection.
    #[error("MQTT connection error: {0}")]
    Connection(#[from] Box<rumqttc::ConnectionError>),

    /// The client could not queue a request for the event loop.
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    // ── Channels ────────────────────────────────────────────────────
    /// The transport task is gone; nothing will be delivered.
    #[error("transport channel closed")]
    ChannelClosed,

    /// The outbound queue is full; the message was not accepted.
    #[error("transport queue full")]
    QueueFull,

    // ── Topics ──────────────────────────────────────────────────────
    /// A topic did not match `factory/{site}/line/{line}/device/{code}/{kind}`.
    #[error("unexpected topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: &'static str },

    // ── Configuration ───────────────────────────────────────────────
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns `true` if retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Client(_) | Self::QueueFull
        )
    }
}

impl From<rumqttc::ConnectionError> for Error {
    fn from(err: rumqttc::ConnectionError) -> Self {
        Self::Connection(Box::new(err))
    }
}
