//! In-memory frame sink and log capture for unit tests.

use async_trait::async_trait;
use rapid_traits::{Frame, FrameKind, FrameSink};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;

/// Records every frame in write order. Can be told to fail the preface or
/// every frame of one kind.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    frames: Arc<Mutex<Vec<Frame>>>,
    prefaces: Arc<AtomicUsize>,
    fail_preface: bool,
    fail_kind: Option<FrameKind>,
}

impl RecordingSink {
    pub(crate) fn failing_preface(mut self) -> Self {
        self.fail_preface = true;
        self
    }

    pub(crate) fn failing(mut self, kind: FrameKind) -> Self {
        self.fail_kind = Some(kind);
        self
    }

    pub(crate) fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    pub(crate) fn prefaces(&self) -> usize {
        self.prefaces.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn write_preface(&mut self) -> io::Result<()> {
        if self.fail_preface {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.prefaces.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        if self.fail_kind == Some(frame.kind()) {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.frames.lock().unwrap().push(frame.clone());
        tokio::task::yield_now().await;
        Ok(())
    }
}

/// Log output captured by [`capture_logs`].
#[derive(Clone, Default)]
pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Routes this thread's INFO-and-above events into a buffer until the guard
/// drops. Only reliable on the current-thread test runtime.
pub(crate) fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buf = LogBuffer::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_target(false)
        .with_writer(move || writer.clone())
        .finish();
    (buf, tracing::subscriber::set_default(subscriber))
}
