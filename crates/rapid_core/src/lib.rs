pub mod config;
pub mod drain;
pub mod engine;
pub mod error;
pub mod handshake;
pub mod metrics;
pub mod stream_id;
pub mod worker;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::{Context, Result};
use config::RunConfig;
use drain::{spawn_drain, DrainOutcome};
use engine::Coordinator;
use error::SetupError;
use handshake::Handshake;
use metrics::{Metrics, Summary};
use rapid_net::transport::Connection;
use rapid_net::HpackEncoder;
use std::sync::Arc;
use tokio::task::JoinHandle;
use worker::{RequestTemplate, WorkerContext};
use writer::SyncWriter;

/// Result of a finished run.
///
/// The drain task outlives the workers and keeps reading until the
/// connection ends; callers decide whether to await or abort it.
pub struct RunOutcome {
    pub summary: Summary,
    pub drain: JoinHandle<DrainOutcome>,
}

/// Dials the configured target and runs the whole probe over it.
pub async fn run(config: &RunConfig) -> Result<RunOutcome> {
    tracing::info!("Connecting to {}", config.target);
    let conn = rapid_net::dial(&config.target, config.verify_tls)
        .await
        .with_context(|| format!("Failed to dial {}", config.target.dial_addr()))?;

    Ok(run_on(conn, config).await?)
}

/// Runs the probe over an already-established connection.
pub async fn run_on(conn: Connection, config: &RunConfig) -> Result<RunOutcome, SetupError> {
    let (mut reader, writer) = conn.into_framed();
    let writer = SyncWriter::new(writer);
    let metrics = Arc::new(Metrics::new());

    Handshake::new(&writer, &metrics).run(&mut reader).await?;

    let drain = spawn_drain(reader, metrics.clone());

    let ctx = Arc::new(WorkerContext::new(
        writer,
        metrics,
        HpackEncoder,
        RequestTemplate::from_target(&config.target),
    ));
    let summary = Coordinator::new(ctx, config.plan.clone()).run().await;

    Ok(RunOutcome { summary, drain })
}
