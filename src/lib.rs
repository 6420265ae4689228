//! # Moonview
//!
//! State synchronization and JSON-RPC subsystem for a touchscreen 3D
//! printer front-end. Maintains a persistent websocket connection to the
//! printer controller API, mirrors its reported status into a shared
//! hierarchical state store, and fans status deltas out to registered UI
//! consumers under a single render lock.
//!
//! ## Architecture
//!
//! Moonview is organized as a workspace with two crates:
//!
//! 1. **moonview-core** - State store, delta merge, error types, settings
//! 2. **moonview-client** - Websocket transport, RPC correlator,
//!    notification fan-out, derived print-status tracking
//!
//! The UI layer (panels, widgets, rendering) lives outside this workspace
//! and plugs in through the [`NotifyConsumer`] trait: each panel registers
//! with the [`Fanout`] and receives every status delta, in registration
//! order, while the render lock is held.

pub use moonview_core::{
    value_at, Error, ReconnectSettings, Result, RpcError, Settings, StateStore, TransportError,
};

pub use moonview_client::{
    ConnectionEvent, ConsumerHandle, Correlator, Fanout, NotifyConsumer, PrinterClient,
    SharedState, Transport, TransportConfig, TransportEvent,
};

pub use moonview_client::status::{
    format_duration, FanSpeeds, FlowRateEstimator, LayerProgress, PrintStatusTracker, TimeProgress,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
