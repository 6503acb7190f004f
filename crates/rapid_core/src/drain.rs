use rapid_traits::{FrameKind, FrameSource, ReadError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::metrics::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainEnd {
    /// Peer closed the stream on a frame boundary.
    Closed,
    /// The transport failed and can yield nothing more.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainOutcome {
    pub frames: u64,
    pub skipped: u64,
    pub end: DrainEnd,
}

/// Consumes inbound frames until the connection ends.
///
/// Takes the reader by value: once the handshake hands it over, no other
/// task can pull a frame off the connection.
pub async fn drain<R: FrameSource>(mut reader: R, metrics: Arc<Metrics>) -> DrainOutcome {
    let mut frames = 0;
    let mut skipped = 0;

    loop {
        match reader.read_frame().await {
            Ok(frame) => {
                frames += 1;
                metrics.record_frame_received();
                info!("Received frame: {}", frame);
                if frame.kind() == FrameKind::GoAway {
                    if let Some(goaway) = frame.goaway() {
                        warn!(
                            "Server is going away: last_stream={} reason={}",
                            goaway.last_stream_id, goaway.reason
                        );
                    }
                }
            }
            Err(e) if e.is_terminal() => {
                let end = if matches!(e, ReadError::Closed) {
                    debug!("Inbound stream closed after {} frames", frames);
                    DrainEnd::Closed
                } else {
                    error!("Failed to read frame, stopping inbound drain: {}", e);
                    DrainEnd::Failed
                };
                return DrainOutcome { frames, skipped, end };
            }
            Err(e) => {
                skipped += 1;
                warn!("Failed to read frame: {}", e);
            }
        }
    }
}

pub fn spawn_drain<R>(reader: R, metrics: Arc<Metrics>) -> JoinHandle<DrainOutcome>
where
    R: FrameSource + 'static,
{
    tokio::spawn(drain(reader, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use rapid_net::codec::encode_frame;
    use rapid_net::FramedRead;
    use rapid_traits::{Frame, Reason, StreamId};
    use tokio::io::{duplex, AsyncWriteExt};

    #[tokio::test]
    async fn counts_frames_until_clean_close() {
        let (mut peer, client) = duplex(4096);
        let metrics = Arc::new(Metrics::new());
        let handle = spawn_drain(FramedRead::new(client), metrics.clone());

        let mut buf = BytesMut::new();
        encode_frame(&Frame::rst_stream(StreamId::new(3), Reason::CANCEL), &mut buf);
        encode_frame(&Frame::settings_ack(), &mut buf);
        peer.write_all(&buf).await.unwrap();
        drop(peer);

        let outcome = handle.await.unwrap();
        assert_eq!(
            outcome,
            DrainOutcome {
                frames: 2,
                skipped: 0,
                end: DrainEnd::Closed,
            }
        );
        assert_eq!(metrics.snapshot().frames_received, 2);
    }

    #[tokio::test]
    async fn keeps_going_after_recoverable_errors() {
        let mut buf = BytesMut::new();
        // WINDOW_UPDATE with a 3-byte payload
        buf.put_slice(&[0, 0, 3, 0x8, 0, 0, 0, 0, 0, 0, 0, 1]);
        encode_frame(&Frame::settings(&[]), &mut buf);

        let metrics = Arc::new(Metrics::new());
        let outcome = drain(FramedRead::new(&buf[..]), metrics.clone()).await;

        assert_eq!(outcome.frames, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.end, DrainEnd::Closed);
        assert_eq!(metrics.snapshot().frames_received, 1);
    }

    #[tokio::test]
    async fn stops_on_truncated_frame() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::settings_ack(), &mut buf);
        // header announcing 8 bytes, only 2 follow
        buf.put_slice(&[0, 0, 8, 0x6, 0, 0, 0, 0, 0, 1, 2]);

        let metrics = Arc::new(Metrics::new());
        let outcome = drain(FramedRead::new(&buf[..]), metrics).await;
        assert_eq!(outcome.frames, 1);
        assert_eq!(outcome.end, DrainEnd::Failed);
    }
}
