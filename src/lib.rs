//! Zenoh bridge for OPC-DA tag polling.
//!
//! Periodically reads a fixed set of named tags from a legacy tag source
//! and republishes each reading on a Zenoh topic. A cycle timer enqueues
//! one read task per tag; a fixed pool of workers, each holding its own
//! dedicated tag-source connection, drains the queue and forwards
//! readings to a shared broker.
//!
//! # Topics
//!
//! Every reading is published under the configured topic, used directly
//! as the Zenoh key expression:
//!
//! ```text
//! <topic>  e.g. plant/line1
//! ```
//!
//! # Architecture
//!
//! - [`bridge::Bridge`] owns the lifecycle: connect broker, start
//!   workers, start timer; on stop, cancel the timer, deliver one
//!   end-of-work marker per worker, join the pool, disconnect.
//! - [`queue::TaskQueue`] is the only state shared across workers.
//! - [`source::TagSource`] and [`broker::Broker`] are the capability
//!   seams for the tag protocol and the bus; the bridge implements
//!   neither wire protocol.
//! - Failures travel as [`error::Problem`] values; no operational
//!   failure panics or unwinds a worker.

pub mod bridge;
pub mod broker;
pub mod config;
pub mod domain;
pub mod error;
pub mod queue;
pub mod source;
pub mod timer;
pub mod worker;
pub mod zenoh_broker;

pub use bridge::{Bridge, BridgeState};
pub use broker::{Broker, BrokerCall, Connected, ConsoleBroker, Disconnected, Published, RecordingBroker};
pub use config::{BridgeConfig, BrokerKind, ConfigError, LogFormat, LoggingConfig, OpcdaConfig, ZenohConfig};
pub use domain::{Milliseconds, TagPath, TagValue};
pub use error::{Outcome, Problem};
pub use queue::{QueueItem, Task, TaskQueue};
pub use source::{SimTagSource, TagReader, TagSource};
pub use timer::CycleTimer;
pub use worker::{PollWorker, Worker};
pub use zenoh_broker::ZenohBroker;

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - [`LogFormat::Text`] (default): human-readable text
/// - [`LogFormat::Json`]: structured JSON for log aggregation
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) -> Outcome<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry();
    match config.format {
        LogFormat::Text => registry
            .with(fmt::layer())
            .with(filter)
            .try_init()
            .map_err(|e| Problem::from_error("failed to initialize tracing", e))?,
        LogFormat::Json => registry
            .with(fmt::layer().json())
            .with(filter)
            .try_init()
            .map_err(|e| Problem::from_error("failed to initialize tracing", e))?,
    }

    Ok(())
}
