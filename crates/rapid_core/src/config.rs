use clap::Parser;
use rapid_traits::{Scheme, Target, TargetError};
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::engine::LoadPlan;

/// Command-line surface of the probe.
#[derive(Parser, Debug, Clone)]
#[command(name = "rapid_reset")]
#[command(
    author,
    version,
    about = "Opens and immediately resets HTTP/2 streams over a single connection",
    long_about = None
)]
pub struct Cli {
    /// Number of requests to send
    #[arg(long, default_value_t = 5)]
    pub requests: usize,

    /// Server URL
    #[arg(long, default_value = "https://localhost:443")]
    pub url: String,

    /// Wait time in milliseconds between starting workers
    #[arg(long, default_value_t = 0)]
    pub wait: u64,

    /// Delay in milliseconds between sending HEADERS and RST_STREAM
    #[arg(long, default_value_t = 0)]
    pub delay: u64,

    /// Maximum number of concurrently running workers (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    pub concurrency: usize,

    /// Verify the server certificate against the webpki root store
    #[arg(long)]
    pub verify_tls: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub target: Target,
    pub plan: LoadPlan,
    pub verify_tls: bool,
    pub output: OutputFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target: Target {
                scheme: Scheme::Https,
                host: "localhost".to_string(),
                port: 443,
                authority: "localhost:443".to_string(),
                path: "/".to_string(),
            },
            plan: LoadPlan::default(),
            verify_tls: false,
            output: OutputFormat::Text,
        }
    }
}

impl TryFrom<Cli> for RunConfig {
    type Error = TargetError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        Ok(Self {
            target: Target::parse(&cli.url)?,
            plan: LoadPlan {
                requests: cli.requests,
                wait: Duration::from_millis(cli.wait),
                delay: Duration::from_millis(cli.delay),
                concurrency: NonZeroUsize::new(cli.concurrency),
            },
            verify_tls: cli.verify_tls,
            output: if cli.json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
        })
    }
}
