// Error taxonomy for the remote-control engine.
//
// Every variant is local to the client and non-fatal: the engine reports the
// error (output log and/or tracing) and keeps running.

use thiserror::Error;

/// Coarse classification of an [`EngineError`], used by the output log and
/// by callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected user input (blank or malformed host, empty command name).
    Input,
    /// Socket open/send/close failure.
    Transport,
    /// Malformed inbound frame.
    Decode,
    /// Command attempted while the connection is not open.
    NotConnected,
    /// The server explicitly reported a failure.
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Please enter an IP address.")]
    EmptyAddress,

    #[error("invalid host address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("command name must not be empty")]
    EmptyCommand,

    #[error("connection failed: {0}")]
    Transport(String),

    #[error("failed to decode frame: {0}")]
    Decode(String),

    #[error("Not connected. Please connect first.")]
    NotConnected,

    #[error("Error: {message}\n\n{output}")]
    Protocol { message: String, output: String },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::EmptyAddress
            | EngineError::InvalidAddress { .. }
            | EngineError::EmptyCommand => ErrorKind::Input,
            EngineError::Transport(_) => ErrorKind::Transport,
            EngineError::Decode(_) => ErrorKind::Decode,
            EngineError::NotConnected => ErrorKind::NotConnected,
            EngineError::Protocol { .. } => ErrorKind::Protocol,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Decode(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for EngineError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        EngineError::Transport(e.to_string())
    }
}
