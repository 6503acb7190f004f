use rapid_traits::{Frame, HeaderEncoder, Reason, StreamId, Target};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::WriteError;
use crate::metrics::Metrics;
use crate::stream_id::StreamIdAllocator;
use crate::writer::SyncWriter;

/// The fixed request every worker sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    pub scheme: String,
    pub path: String,
    pub authority: String,
}

impl RequestTemplate {
    pub fn from_target(target: &Target) -> Self {
        Self {
            scheme: target.scheme.as_str().to_string(),
            path: target.path.clone(),
            authority: target.authority.clone(),
        }
    }

    pub fn header_list(&self) -> [(&str, &str); 4] {
        [
            (":method", "GET"),
            (":path", &self.path),
            (":scheme", &self.scheme),
            (":authority", &self.authority),
        ]
    }
}

/// State shared by every worker of a run.
pub struct WorkerContext {
    pub writer: SyncWriter,
    pub ids: StreamIdAllocator,
    pub metrics: Arc<Metrics>,
    pub encoder: Box<dyn HeaderEncoder>,
    pub request: RequestTemplate,
}

impl WorkerContext {
    pub fn new<E: HeaderEncoder + 'static>(
        writer: SyncWriter,
        metrics: Arc<Metrics>,
        encoder: E,
        request: RequestTemplate,
    ) -> Self {
        Self {
            writer,
            ids: StreamIdAllocator::new(),
            metrics,
            encoder: Box::new(encoder),
            request,
        }
    }
}

/// What one open/cancel sequence achieved.
#[derive(Debug)]
pub enum WorkerReport {
    Completed {
        stream_id: StreamId,
        headers: Result<(), WriteError>,
        reset: Result<(), WriteError>,
    },
    /// No stream identifier was left to use; nothing was written.
    Exhausted,
}

/// Opens one stream and cancels it after `delay`.
///
/// A failed HEADERS write does not skip the RST_STREAM: the reset path is
/// exercised for every request either way. The worker finishes exactly once
/// whatever the write results were.
pub async fn run_worker(ctx: Arc<WorkerContext>, delay: Duration) -> WorkerReport {
    let block = ctx.encoder.encode(&ctx.request.header_list());

    let Some(stream_id) = ctx.ids.next() else {
        error!("Stream identifiers exhausted, request not sent");
        return WorkerReport::Exhausted;
    };

    let open = Frame::headers(stream_id, block, true, true);
    let headers = match ctx.writer.write_frame(&open).await {
        Ok(()) => {
            ctx.metrics.record_headers_sent();
            info!("[{}] Sent HEADERS on stream {}", stream_id, stream_id);
            Ok(())
        }
        Err(e) => {
            warn!("[{}] Failed to send HEADERS: {}", stream_id, e);
            Err(e)
        }
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let cancel = Frame::rst_stream(stream_id, Reason::CANCEL);
    let reset = match ctx.writer.write_frame(&cancel).await {
        Ok(()) => {
            ctx.metrics.record_reset_sent();
            info!("[{}] Sent RST_STREAM on stream {}", stream_id, stream_id);
            Ok(())
        }
        Err(e) => {
            warn!("[{}] Failed to send RST_STREAM: {}", stream_id, e);
            Err(e)
        }
    };

    WorkerReport::Completed {
        stream_id,
        headers,
        reset,
    }
}
