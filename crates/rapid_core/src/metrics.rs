//! Run-level frame accounting and the final report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Frame counters shared by every worker and the drain loop.
#[derive(Debug, Default)]
pub struct Metrics {
    headers_sent: AtomicU64,
    resets_sent: AtomicU64,
    frames_received: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_headers_sent(&self) {
        self.headers_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reset_sent(&self) {
        self.resets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            headers_sent: self.headers_sent.load(Ordering::Relaxed),
            resets_sent: self.resets_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub headers_sent: u64,
    pub resets_sent: u64,
    pub frames_received: u64,
}

/// Brackets the request-issuing phase.
pub struct RunClock {
    started_at: DateTime<Utc>,
    start: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            start: Instant::now(),
        }
    }

    pub fn stop(self) -> RunWindow {
        RunWindow {
            started_at: self.started_at,
            finished_at: Utc::now(),
            elapsed: self.start.elapsed(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunWindow {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// How the spawned workers finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CompletionTally {
    pub completed: usize,
    pub headers_failed: usize,
    pub resets_failed: usize,
    pub exhausted: usize,
    pub panicked: usize,
}

/// Rounded events per second, `None` when no measurable time elapsed.
pub fn throughput(count: u64, elapsed: Duration) -> Option<u64> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    Some((count as f64 / secs).round() as u64)
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub requested: usize,
    #[serde(flatten)]
    pub counts: MetricsSnapshot,
    pub workers: CompletionTally,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub rate: Option<u64>,
}

impl Summary {
    pub fn new(
        requested: usize,
        counts: MetricsSnapshot,
        workers: CompletionTally,
        window: RunWindow,
    ) -> Self {
        Self {
            requested,
            counts,
            workers,
            started_at: window.started_at,
            finished_at: window.finished_at,
            elapsed_secs: window.elapsed.as_secs_f64(),
            rate: throughput(counts.headers_sent, window.elapsed),
        }
    }

    /// Requests whose HEADERS frame never made it onto the wire.
    pub fn shortfall(&self) -> u64 {
        (self.requested as u64).saturating_sub(self.counts.headers_sent)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate = match self.rate {
            Some(rate) => rate.to_string(),
            None => "n/a".to_string(),
        };
        writeln!(f)?;
        writeln!(f, "--- Summary ---")?;
        writeln!(
            f,
            "Frames sent: HEADERS = {}, RST_STREAM = {}",
            self.counts.headers_sent, self.counts.resets_sent
        )?;
        writeln!(f, "Frames received: {}", self.counts.frames_received)?;
        writeln!(f, "Total time: {:.2} seconds ({} rps)", self.elapsed_secs, rate)
    }
}
