//! Zenoh bridge for OPC-DA tag polling.
//!
//! Loads a JSON5 configuration, assembles the worker pool and broker
//! adapter, runs the bridge until Ctrl+C, then shuts it down cleanly.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use zenoh_bridge_opcda::{
    Bridge, Broker, BridgeConfig, BrokerKind, ConsoleBroker, LoggingConfig, Milliseconds,
    SimTagSource, TagPath, TagValue, ZenohBroker,
};

/// Zenoh bridge for OPC-DA tag polling.
#[derive(Parser, Debug)]
#[command(name = "zenoh-bridge-opcda")]
#[command(about = "Polls OPC-DA tags and publishes readings to Zenoh")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "opcda.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = BridgeConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    zenoh_bridge_opcda::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting zenoh-bridge-opcda");
    info!("Loaded configuration from {:?}", args.config);

    let broker: Arc<dyn Broker> = match config.opcda.broker {
        BrokerKind::Zenoh => Arc::new(ZenohBroker::new(config.zenoh.clone())),
        BrokerKind::Console => Arc::new(ConsoleBroker::new()),
    };

    // The real OPC-DA binding is a platform-specific capability supplied
    // through the TagSource trait; the shipped binary serves values from
    // the configured simulation table instead.
    let mut readings = config.opcda.simulation.clone();
    for tag in &config.opcda.tags {
        readings
            .entry(tag.clone())
            .or_insert(TagValue::Float(0.0));
    }
    let source = Arc::new(SimTagSource::new(readings));

    let tag_paths: Vec<TagPath> = config.opcda.tags.iter().map(TagPath::new).collect();
    let interval = Milliseconds::new(config.opcda.poll_interval_ms);
    let topic = config.opcda.topic.clone();

    info!(
        server_id = %config.opcda.server_id,
        host = %config.opcda.host,
        tags = tag_paths.len(),
        workers = config.opcda.workers,
        %interval,
        topic = %topic,
        "Bridge configured"
    );

    let mut bridge = Bridge::with_pool(source, Arc::clone(&broker), config.opcda.workers);

    {
        let tag_paths = &tag_paths;
        let topic = topic.as_str();
        tokio::task::block_in_place(|| bridge.start(tag_paths, interval, topic))
            .map_err(|e| anyhow::anyhow!("Failed to start bridge: {}", e))?;
    }

    // Bridge status, alongside the telemetry keys.
    let status_key = format!("{}/@/status", topic);
    let status = serde_json::json!({
        "bridge": "opcda",
        "version": env!("CARGO_PKG_VERSION"),
        "tags": config.opcda.tags,
        "status": "running",
    });
    if let Err(e) =
        tokio::task::block_in_place(|| broker.publish(&status_key, &status.to_string()))
    {
        error!(%e, "Failed to publish bridge status");
    }

    info!("Bridge running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    let status = serde_json::json!({
        "bridge": "opcda",
        "status": "offline",
    });
    let _ = tokio::task::block_in_place(|| broker.publish(&status_key, &status.to_string()));

    tokio::task::block_in_place(|| bridge.stop())
        .map_err(|e| anyhow::anyhow!("Failed to stop bridge: {}", e))?;
    info!("OPC-DA bridge stopped");

    Ok(())
}
