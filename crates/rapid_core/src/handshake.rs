use rapid_traits::{Frame, FrameKind, FrameSource, Setting};
use tracing::{debug, info, warn};

use crate::error::SetupError;
use crate::metrics::Metrics;
use crate::writer::SyncWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Start,
    PrefaceSent,
    SettingsSent,
    Ready,
}

/// Brings a fresh connection to the point where streams may be opened.
///
/// Sends the preface and our SETTINGS, then reads until the server's own
/// SETTINGS arrives. Any frame read here counts as received; frames other
/// than that first SETTINGS are logged and dropped.
pub struct Handshake<'a> {
    writer: &'a SyncWriter,
    metrics: &'a Metrics,
    settings: Vec<Setting>,
    state: HandshakeState,
}

impl<'a> Handshake<'a> {
    pub fn new(writer: &'a SyncWriter, metrics: &'a Metrics) -> Self {
        Self {
            writer,
            metrics,
            settings: Vec::new(),
            state: HandshakeState::Start,
        }
    }

    /// Parameters for the initial SETTINGS frame. Empty by default.
    pub fn with_settings(mut self, settings: Vec<Setting>) -> Self {
        self.settings = settings;
        self
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Returns the server's SETTINGS frame once the connection is ready.
    pub async fn run<R>(&mut self, reader: &mut R) -> Result<Frame, SetupError>
    where
        R: FrameSource + ?Sized,
    {
        self.writer.write_preface().await.map_err(SetupError::Preface)?;
        self.advance(HandshakeState::PrefaceSent);

        let settings = Frame::settings(&self.settings);
        self.writer
            .write_frame(&settings)
            .await
            .map_err(SetupError::Settings)?;
        info!("Sent SETTINGS: {}", settings);
        self.advance(HandshakeState::SettingsSent);

        loop {
            match reader.read_frame().await {
                Ok(frame) => {
                    self.metrics.record_frame_received();
                    if frame.kind() == FrameKind::Settings && !frame.is_ack() {
                        info!("Got initial SETTINGS frame: {}", frame);
                        self.advance(HandshakeState::Ready);
                        return Ok(frame);
                    }
                    info!("Received frame before SETTINGS: {}", frame);
                }
                Err(e) if e.is_terminal() => return Err(SetupError::Handshake(e)),
                Err(e) => warn!("Failed to read frame: {}", e),
            }
        }
    }

    fn advance(&mut self, next: HandshakeState) {
        debug!("Handshake {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
