//! Replay a captured SSE response body through the unified event parser.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use futures_util::{stream, StreamExt};
use sse_common::config;
use sse_common::sse::streaming::{collect_events, events_from_bytes};
use sse_common::sse::Vendor;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sse-replay")]
#[command(about = "Decode a captured LLM SSE stream into unified events")]
struct Cli {
    /// Wire format of the capture: anthropic | openai
    #[arg(long, env = "SSE_VENDOR")]
    vendor: Vendor,

    /// Capture file (reads stdin when omitted)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Feed the body in chunks of this many bytes (0 = one chunk)
    #[arg(long, default_value = "0")]
    chunk_size: usize,

    /// Print the accumulated response instead of one event per line
    #[arg(long)]
    summary: bool,

    /// Idle timeout in seconds (overrides SSE_IDLE_TIMEOUT_SECS)
    #[arg(long)]
    idle_timeout: Option<u64>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("[sse-replay] Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = config::load_config()?;
    if let Some(secs) = cli.idle_timeout {
        config = config.with_idle_timeout_secs(secs)?;
    }

    let body = read_body(cli.input.as_deref()).await?;
    tracing::info!("Replaying {} bytes as {}", body.len(), cli.vendor);

    let chunks = split_chunks(body, cli.chunk_size);
    let events = events_from_bytes(cli.vendor, stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>)));

    if cli.summary {
        let result = collect_events(events, &config).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let mut events = events;
    while let Some(event) = events.next().await {
        println!("{}", serde_json::to_string(&event?)?);
    }
    Ok(())
}

async fn read_body(input: Option<&std::path::Path>) -> anyhow::Result<Vec<u8>> {
    match input {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut body = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut body)
                .await
                .context("Failed to read stdin")?;
            Ok(body)
        }
    }
}

fn split_chunks(body: Vec<u8>, chunk_size: usize) -> Vec<Vec<u8>> {
    if chunk_size == 0 || body.len() <= chunk_size {
        return vec![body];
    }
    body.chunks(chunk_size).map(<[u8]>::to_vec).collect()
}
