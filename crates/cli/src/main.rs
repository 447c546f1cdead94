//! Entry point for a chord-kv ring node.

use clap::Parser;
use cli::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let config = Config::parse();
    cli::run(config).await
}
