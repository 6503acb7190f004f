use rapid_traits::{Frame, FrameSink};
use tokio::sync::Mutex;

use crate::error::WriteError;

/// The only path outbound bytes take to the connection.
///
/// Every call holds the lock for exactly one preface or frame write, so
/// concurrent workers can never interleave partial frames on the wire.
pub struct SyncWriter {
    sink: Mutex<Box<dyn FrameSink>>,
}

impl SyncWriter {
    pub fn new<S: FrameSink + 'static>(sink: S) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    pub async fn write_preface(&self) -> Result<(), WriteError> {
        let mut sink = self.sink.lock().await;
        sink.write_preface().await.map_err(WriteError::from)
    }

    /// Writes one frame. Failures are returned as-is, never retried.
    pub async fn write_frame(&self, frame: &Frame) -> Result<(), WriteError> {
        let mut sink = self.sink.lock().await;
        sink.write_frame(frame).await.map_err(WriteError::from)
    }
}
