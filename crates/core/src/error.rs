//! Error type shared by every client operation.

use std::io;

/// Errors that can occur while talking to the simulator.
#[derive(Debug, thiserror::Error)]
pub enum BngError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A timeout cut a frame in half; the channel can no longer be read.
    #[error("Connection broken: {0}")]
    ConnectionBroken(String),

    #[error("Timeout waiting for {0}")]
    Timeout(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Protocol version mismatch: client speaks {client}, simulator speaks {simulator}")]
    ProtocolMismatch { client: String, simulator: String },

    #[error("Unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse { expected: String, got: String },

    /// The simulator reported a failure (`bngError`).
    #[error("Simulator error: {0}")]
    Simulator(String),

    /// The simulator rejected a value we sent (`bngValueError`).
    #[error("Simulator rejected value: {0}")]
    InvalidValue(String),

    #[error("Invalid orientation: {0}")]
    InvalidOrientation(String),

    #[error("Invalid pose: {0}")]
    InvalidPose(String),

    #[error("Vehicle not connected: {0}")]
    VehicleNotConnected(String),

    #[error("Scenario has not been made yet: {0}")]
    ScenarioNotMade(String),

    #[error("Duplicate identifier in scenario: {0}")]
    DuplicateId(String),

    #[error("Invalid identifier '{0}': use letters, digits and underscores")]
    InvalidIdentifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(io::Error),
}

impl BngError {
    /// True when the error came from a socket read or write timing out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<io::Error> for BngError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            // Blocking sockets with a read timeout report WouldBlock on Unix
            // and TimedOut on Windows.
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                Self::Timeout(format!("simulator socket ({err})"))
            }
            _ => Self::Io(err),
        }
    }
}
