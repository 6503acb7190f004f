pub mod frame;
pub mod target;

pub use frame::{Flags, Frame, FrameError, FrameKind, GoAway, Reason, Setting, StreamId};
pub use target::{Scheme, Target, TargetError};

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;

/// Fixed byte sequence a client sends once before any framed traffic.
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Size of the fixed frame header preceding every payload.
pub const FRAME_HEADER_LEN: usize = 9;

/// Largest payload a peer may send before it has seen our SETTINGS_MAX_FRAME_SIZE.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;

/// Failure modes when pulling a frame off the wire.
///
/// `Closed` and `Io` leave the connection unusable. The other two variants
/// are raised only after the offending payload has been consumed, so the
/// next read starts on a frame boundary again.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("connection closed by peer")]
    Closed,

    #[error("frame of {len} bytes exceeds max frame size {max}")]
    FrameTooLarge { len: u32, max: u32 },

    #[error("malformed frame: {0}")]
    Malformed(#[from] FrameError),

    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl ReadError {
    /// True when no further frames can be read from this source.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReadError::Closed | ReadError::Io(_))
    }
}

/// Outbound half of the frame codec.
#[async_trait]
pub trait FrameSink: Send {
    /// Writes the client connection preface.
    async fn write_preface(&mut self) -> io::Result<()>;

    /// Encodes and writes exactly one frame.
    async fn write_frame(&mut self, frame: &Frame) -> io::Result<()>;
}

/// Inbound half of the frame codec.
#[async_trait]
pub trait FrameSource: Send {
    async fn read_frame(&mut self) -> Result<Frame, ReadError>;
}

/// Compresses a header list into a header block fragment.
pub trait HeaderEncoder: Send + Sync {
    fn encode(&self, headers: &[(&str, &str)]) -> Bytes;
}
