//! Printer API client
//!
//! Wires the transport, the RPC correlator, and the notification
//! fan-out together. A router task classifies every inbound frame:
//! responses complete their pending call, status-update notifications go
//! through the fan-out, and everything else is logged and dropped.
//!
//! On disconnect the pending table is purged — every outstanding call
//! resolves with [`RpcError::Disconnected`] — and a connection event is
//! broadcast so the application can resubscribe once the transport
//! reconnects.

use crate::fanout::Fanout;
use crate::rpc::{classify_frame, CallOutcome, Correlator, InboundFrame, RpcRequest};
use crate::transport::{Transport, TransportConfig, TransportEvent};
use moonview_core::{RpcError, Settings};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Status-update notification method pushed by the controller.
const STATUS_UPDATE_METHOD: &str = "notify_status_update";

/// Connectivity change, broadcast to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The API connection is up
    Connected,
    /// The API connection dropped; pending calls were purged
    Disconnected,
}

/// Client for the printer controller API.
///
/// Owns the transport task and the frame router; cheap to share behind
/// an `Arc`.
pub struct PrinterClient {
    correlator: Arc<Correlator>,
    fanout: Arc<Fanout>,
    outbound: mpsc::Sender<String>,
    events: broadcast::Sender<ConnectionEvent>,
    transport: Transport,
    router: JoinHandle<()>,
}

impl PrinterClient {
    /// Spawn the transport and router tasks for `settings`.
    ///
    /// The connection is established (and re-established) in the
    /// background; calls issued while disconnected queue until the
    /// transport comes up or fail once the queue is full.
    pub fn connect(settings: &Settings, fanout: Arc<Fanout>) -> Self {
        let config = TransportConfig::from_settings(settings);
        let (frames_tx, frames_rx) = mpsc::channel(64);
        let transport = Transport::spawn(config, frames_tx);
        let outbound = transport.sender();

        let correlator = Arc::new(Correlator::new());
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));

        let router = tokio::spawn(route(
            frames_rx,
            Arc::clone(&correlator),
            Arc::clone(&fanout),
            events.clone(),
        ));

        Self {
            correlator,
            fanout,
            outbound,
            events,
            transport,
            router,
        }
    }

    /// Issue an RPC call and await its outcome.
    ///
    /// Resolves with the server's result payload, the server's error, or
    /// [`RpcError::Disconnected`] if the connection drops first. Each
    /// outcome is delivered at most once.
    pub async fn call(&self, method: &str, params: Option<Value>) -> CallOutcome {
        let (id, rx) = self.correlator.register(method);
        let frame = RpcRequest::new(method, params, id).to_frame();

        if self.outbound.send(frame).await.is_err() {
            // Transport task is gone; the pending entry will never be
            // completed by a response, so resolve it here.
            self.correlator.complete(id, Err(RpcError::Disconnected));
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(RpcError::Disconnected),
        }
    }

    /// Send a method with no interest in the response (fire-and-forget).
    ///
    /// The frame keeps the usual wire shape including an id, but nothing
    /// is tracked; a response to it hits the unknown-id path and is
    /// discarded. Never blocks, so it is safe from a `consume` callback.
    pub fn send(&self, method: &str, params: Option<Value>) {
        let id = self.correlator.next_id();
        let frame = RpcRequest::new(method, params, id).to_frame();
        if let Err(e) = self.outbound.try_send(frame) {
            tracing::warn!(method, "Dropping outbound call: {}", e);
        }
    }

    /// Subscribe to connectivity changes
    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// The fan-out this client feeds
    pub fn fanout(&self) -> &Arc<Fanout> {
        &self.fanout
    }

    /// Number of calls awaiting a response (diagnostics)
    pub fn pending_calls(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Close the connection and stop the background tasks
    pub async fn shutdown(self) {
        self.transport.shutdown().await;
        // The frame channel closed with the transport; the router drains
        // and exits on its own.
        let _ = self.router.await;
        self.correlator.fail_all(RpcError::Disconnected);
    }
}

impl std::fmt::Debug for PrinterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrinterClient")
            .field("pending_calls", &self.pending_calls())
            .field("consumers", &self.fanout.consumer_count())
            .finish()
    }
}

/// Route transport events until the transport shuts down.
async fn route(
    mut frames: mpsc::Receiver<TransportEvent>,
    correlator: Arc<Correlator>,
    fanout: Arc<Fanout>,
    events: broadcast::Sender<ConnectionEvent>,
) {
    while let Some(event) = frames.recv().await {
        match event {
            TransportEvent::Connected => {
                let _ = events.send(ConnectionEvent::Connected);
            }
            TransportEvent::Disconnected { reason } => {
                let purged = correlator.fail_all(RpcError::Disconnected);
                if purged > 0 {
                    tracing::info!(purged, %reason, "Purged pending calls on disconnect");
                }
                let _ = events.send(ConnectionEvent::Disconnected);
            }
            TransportEvent::Frame(text) => handle_frame(&text, &correlator, &fanout),
        }
    }
}

/// Classify and dispatch one inbound frame.
fn handle_frame(text: &str, correlator: &Correlator, fanout: &Fanout) {
    match classify_frame(text) {
        Ok(InboundFrame::Response { id, outcome }) => {
            if !correlator.complete(id, outcome) {
                // Late, duplicate, or fire-and-forget id.
                tracing::debug!(id, "Response for unknown call id, discarding");
            }
        }
        Ok(InboundFrame::Notification { method, params }) => {
            if method == STATUS_UPDATE_METHOD {
                match params.first() {
                    Some(delta) => fanout.on_notification(delta),
                    None => tracing::warn!("Status update without a delta payload"),
                }
            } else {
                tracing::trace!(%method, "Ignoring notification");
            }
        }
        Err(e) => {
            tracing::warn!("Undecodable frame, discarding: {}", e);
        }
    }
}
