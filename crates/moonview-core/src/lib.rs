//! # Moonview Core
//!
//! Core types for the moonview printer front-end.
//! Provides the shared state store with path-addressed lookups and delta
//! merging, the error taxonomy, and the settings layer.

pub mod config;
pub mod error;
pub mod state;

pub use config::{ReconnectSettings, Settings};
pub use error::{Error, Result, RpcError, TransportError};
pub use state::{value_at, StateStore, STATUS_NAMESPACE};
