use anyhow::Context;
use clap::Parser;
use rapid_core::config::{Cli, OutputFormat, RunConfig};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Frame log lines and the summary share stdout
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let config = RunConfig::try_from(cli).context("Failed to parse URL")?;
    let outcome = rapid_core::run(&config).await?;
    outcome.drain.abort();

    match config.output {
        OutputFormat::Text => println!("{}", outcome.summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome.summary)?),
    }

    Ok(())
}
