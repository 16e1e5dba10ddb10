//! Scribe - multi-source Ordinals inscription aggregator

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribe::{config::Args, server, AppState, ScribeError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("scribe={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate().map_err(ScribeError::Config) {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Scribe - Inscription Aggregator");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Content host: {}", args.content_host);
    info!("Request timeout: {}ms", args.request_timeout_ms);
    info!("Aggregate timeout: {}ms", args.aggregate_timeout_ms);
    for (name, endpoint) in [
        ("A", args.sources.source_a()),
        ("B", args.sources.source_b()),
        ("C", args.sources.source_c()),
        ("D", args.sources.source_d()),
    ] {
        match endpoint {
            Some(endpoint) => info!(
                "Source {}: {}{} (api key: {})",
                name,
                endpoint.base_url,
                endpoint.path,
                if endpoint.api_key.is_some() { "set" } else { "none" }
            ),
            None => info!("Source {}: disabled", name),
        }
    }
    info!("======================================");

    let state = Arc::new(AppState::new(args));
    server::run(state).await?;

    Ok(())
}
