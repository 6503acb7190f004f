use rapid_traits::ReadError;
use std::io;
use thiserror::Error;

/// A single frame write that did not reach the transport.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct WriteError(#[from] pub io::Error);

/// Failures that leave the run without a usable connection.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to send client preface: {0}")]
    Preface(#[source] WriteError),

    #[error("failed to write settings: {0}")]
    Settings(#[source] WriteError),

    #[error("connection lost while waiting for server SETTINGS: {0}")]
    Handshake(#[source] ReadError),
}
