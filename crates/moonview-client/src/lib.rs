#![allow(dead_code)]
//! # Moonview Client
//!
//! The network-facing half of moonview: a persistent websocket JSON-RPC
//! client for the printer controller API. One I/O task owns the
//! connection and reconnects with backoff; inbound frames are either RPC
//! responses, matched to their originating call by id, or unsolicited
//! status notifications, merged into the shared [`StateStore`] and fanned
//! out to every registered consumer under the render lock.
//!
//! [`StateStore`]: moonview_core::StateStore

pub mod client;
pub mod fanout;
pub mod rpc;
pub mod status;
pub mod transport;

pub use client::{ConnectionEvent, PrinterClient};
pub use fanout::{Fanout, ConsumerHandle, NotifyConsumer, SharedState};
pub use rpc::{CallOutcome, Correlator, InboundFrame, RpcRequest};
pub use transport::{Transport, TransportConfig, TransportEvent};
