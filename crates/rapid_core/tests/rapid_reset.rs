//! End-to-end runs against an in-memory HTTP/2 peer.

use rapid_core::config::RunConfig;
use rapid_core::drain::DrainEnd;
use rapid_core::engine::LoadPlan;
use rapid_core::error::SetupError;
use rapid_core::run_on;
use rapid_net::transport::Connection;
use rapid_net::{FramedRead, FramedWrite};
use rapid_traits::{
    Frame, FrameKind, FrameSink, FrameSource, ReadError, Reason, Setting, StreamId,
    CONNECTION_PREFACE,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{duplex, split, AsyncReadExt, DuplexStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const LIMIT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy)]
enum Peer {
    /// Answers with SETTINGS, then reads `expect` frames and never writes again.
    Silent { expect: usize },
    /// Answers with SETTINGS, then hangs up.
    HangUp,
    /// Hangs up without sending anything.
    Refuse,
}

struct PeerLog {
    preface_ok: bool,
    client_settings: Option<Frame>,
    frames: Vec<Frame>,
}

fn spawn_peer(stream: DuplexStream, behavior: Peer) -> JoinHandle<PeerLog> {
    tokio::spawn(async move {
        let (mut read, write) = split(stream);
        let mut preface = [0u8; 24];
        let preface_ok =
            read.read_exact(&mut preface).await.is_ok() && preface == CONNECTION_PREFACE;

        let mut reader = FramedRead::new(read);
        let mut writer = FramedWrite::new(write);
        let mut log = PeerLog {
            preface_ok,
            client_settings: None,
            frames: Vec::new(),
        };

        log.client_settings = reader.read_frame().await.ok();

        match behavior {
            Peer::Refuse => return log,
            Peer::HangUp => {
                writer.write_frame(&Frame::settings(&[])).await.unwrap();
                return log;
            }
            Peer::Silent { expect } => {
                let settings =
                    Frame::settings(&[Setting::new(Setting::MAX_CONCURRENT_STREAMS, 100)]);
                writer.write_frame(&settings).await.unwrap();
                while log.frames.len() < expect {
                    match reader.read_frame().await {
                        Ok(frame) => log.frames.push(frame),
                        Err(_) => break,
                    }
                }
                // keep the connection open until the client side goes away
                let _ = reader.read_frame().await;
            }
        }
        log
    })
}

fn config(requests: usize) -> RunConfig {
    let mut config = RunConfig::default();
    config.plan = LoadPlan {
        requests,
        ..LoadPlan::default()
    };
    config
}

#[tokio::test]
async fn three_requests_against_silent_peer() {
    let (client, server) = duplex(64 * 1024);
    let peer = spawn_peer(server, Peer::Silent { expect: 6 });

    let outcome = timeout(LIMIT, run_on(Connection::plain(client), &config(3)))
        .await
        .expect("run hung")
        .expect("setup failed");

    let summary = &outcome.summary;
    assert_eq!(summary.workers.completed, 3);
    assert_eq!(summary.counts.headers_sent, 3);
    assert_eq!(summary.counts.resets_sent, 3);
    assert_eq!(summary.counts.frames_received, 1);
    assert_eq!(summary.shortfall(), 0);

    // dropping the drain task releases the client's end of the pipe
    outcome.drain.abort();
    let log = timeout(LIMIT, peer).await.expect("peer hung").unwrap();

    assert!(log.preface_ok);
    let client_settings = log.client_settings.expect("client SETTINGS");
    assert_eq!(client_settings.kind(), FrameKind::Settings);
    assert!(!client_settings.is_ack());

    let mut by_stream: HashMap<StreamId, Vec<FrameKind>> = HashMap::new();
    for frame in &log.frames {
        by_stream.entry(frame.stream_id()).or_default().push(frame.kind());
        if frame.kind() == FrameKind::RstStream {
            assert_eq!(frame.reason(), Some(Reason::CANCEL));
        }
    }
    let mut ids: Vec<u32> = by_stream.keys().map(|id| id.get()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![3, 5, 7]);
    for kinds in by_stream.values() {
        assert_eq!(kinds, &vec![FrameKind::Headers, FrameKind::RstStream]);
    }
}

#[tokio::test]
async fn peer_hang_up_ends_drain_cleanly() {
    let (client, server) = duplex(64 * 1024);
    let peer = spawn_peer(server, Peer::HangUp);

    let outcome = timeout(LIMIT, run_on(Connection::plain(client), &config(3)))
        .await
        .expect("run hung")
        .expect("setup failed");

    assert_eq!(outcome.summary.workers.completed, 3);
    assert!(outcome.summary.counts.headers_sent <= 3);

    let drained = timeout(LIMIT, outcome.drain)
        .await
        .expect("drain loop kept running")
        .unwrap();
    assert_eq!(drained.end, DrainEnd::Closed);
    assert_eq!(drained.frames, 0);

    assert!(peer.await.unwrap().preface_ok);
}

#[tokio::test]
async fn refused_handshake_is_a_setup_error() {
    let (client, server) = duplex(64 * 1024);
    let peer = spawn_peer(server, Peer::Refuse);

    let result = timeout(LIMIT, run_on(Connection::plain(client), &config(3)))
        .await
        .expect("run hung");

    assert!(matches!(result, Err(SetupError::Handshake(ReadError::Closed))));
    assert!(peer.await.unwrap().preface_ok);
}

#[tokio::test]
async fn spaced_launches_with_cap_still_complete() {
    let (client, server) = duplex(64 * 1024);
    let peer = spawn_peer(server, Peer::Silent { expect: 8 });

    let mut config = config(4);
    config.plan.wait = Duration::from_millis(2);
    config.plan.delay = Duration::from_millis(5);
    config.plan.concurrency = std::num::NonZeroUsize::new(1);

    let outcome = timeout(LIMIT, run_on(Connection::plain(client), &config))
        .await
        .expect("run hung")
        .expect("setup failed");
    assert_eq!(outcome.summary.workers.completed, 4);
    assert!(outcome.summary.elapsed_secs > 0.0);
    assert!(outcome.summary.rate.is_some());

    outcome.drain.abort();
    let log = timeout(LIMIT, peer).await.expect("peer hung").unwrap();

    // with one worker at a time, frames strictly alternate open, cancel
    let kinds: Vec<FrameKind> = log.frames.iter().map(Frame::kind).collect();
    assert_eq!(kinds, [FrameKind::Headers, FrameKind::RstStream].repeat(4));
    let ids: Vec<u32> = log.frames.iter().map(|f| f.stream_id().get()).collect();
    assert_eq!(ids, vec![3, 3, 5, 5, 7, 7, 9, 9]);
}
