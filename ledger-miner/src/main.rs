//! Stands in for the external miner process: polls a node's
//! `/make_block` endpoint on an interval, sealing whatever is pending.

use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the ledger node to mine against.
    #[arg(long, env = "LEDGER_MINER_NODE_URL", default_value = "http://127.0.0.1:3000")]
    node_url: String,

    /// Seconds between `/make_block` polls.
    #[arg(long, env = "LEDGER_MINER_INTERVAL_SECS", default_value_t = 5)]
    interval_secs: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let client = reqwest::Client::new();
    let make_block_url = format!("{}/make_block", args.node_url.trim_end_matches('/'));

    tracing::info!(url = %make_block_url, interval = args.interval_secs, "starting miner loop");

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs));
    loop {
        ticker.tick().await;
        match client.get(&make_block_url).send().await {
            Ok(resp) => match resp.json::<serde_json::Value>().await {
                Ok(body) => tracing::info!(?body, "make_block response"),
                Err(e) => tracing::warn!(error = %e, "failed to decode make_block response"),
            },
            Err(e) => tracing::warn!(error = %e, "failed to reach node"),
        }
    }
}
