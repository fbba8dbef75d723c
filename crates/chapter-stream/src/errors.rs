/// Connection-level failures raised by a `GenerationTransport`.
///
/// These never escape `GenerationController::start`; the controller folds
/// them into the session as a terminal error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Backend answered the request with a non-success HTTP status.
    #[error("generation request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// Connecting, sending, or reading the stream failed.
    #[error("transport error: {0}")]
    Io(String),
    /// A frame could not be decoded into a generation event.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Creates an I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// Errors returned directly by the public API.
///
/// Everything that happens after a stream is open is reported through
/// `SessionState`, not through this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Invalid transport, pacer, or controller configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Malformed generation request.
    #[error("validation error: {0}")]
    Validation(String),
    /// `start` was called while another session is still active.
    #[error("a generation session is already active ({session_id})")]
    SessionActive { session_id: uuid::Uuid },
}

impl GenerationError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
