//! Websocket transport to the printer controller API
//!
//! A single I/O task owns the connection for the life of the client:
//! it connects (retrying with bounded exponential backoff), writes
//! outbound frames from a queue, and delivers every inbound text frame,
//! in arrival order, to the event channel. No frame is reordered or
//! coalesced; response correlation and delta ordering depend on that.
//!
//! A dropped connection surfaces as [`TransportEvent::Disconnected`] so
//! the correlator can purge pending calls and the application can show
//! connectivity state, then the task goes back to connecting.

use futures_util::{SinkExt, StreamExt};
use moonview_core::{Settings, TransportError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Concrete websocket stream type.
type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures_util::stream::SplitSink<WsStream, Message>;
type WsSource = futures_util::stream::SplitStream<WsStream>;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Websocket URL of the controller API endpoint
    pub url: String,
    /// Delay before the first reconnect attempt
    pub initial_backoff: Duration,
    /// Upper bound for the backoff delay
    pub max_backoff: Duration,
    /// Capacity of the outbound frame queue
    pub outbound_queue: usize,
}

impl TransportConfig {
    /// Build a transport config from client settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            url: settings.endpoint.clone(),
            initial_backoff: Duration::from_millis(settings.reconnect.initial_delay_ms),
            max_backoff: Duration::from_millis(settings.reconnect.max_delay_ms),
            outbound_queue: settings.outbound_queue,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Event delivered by the transport task
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A connection to the endpoint was established
    Connected,
    /// One inbound text frame, delivered in arrival order
    Frame(String),
    /// An established connection dropped
    Disconnected {
        /// Why the connection dropped.
        reason: TransportError,
    },
}

/// Why the connection loop ended
enum LoopExit {
    /// Shutdown was requested; do not reconnect
    Shutdown,
    /// The connection dropped; reconnect after backoff
    Lost(TransportError),
}

/// Handle to the websocket I/O task
pub struct Transport {
    outbound_tx: mpsc::Sender<String>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl Transport {
    /// Spawn the I/O task.
    ///
    /// Events (connects, frames, disconnects) are delivered through
    /// `events` in order. The task runs until [`Transport::shutdown`] is
    /// called or the event receiver is dropped.
    pub fn spawn(config: TransportConfig, events: mpsc::Sender<TransportEvent>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(run(config, outbound_rx, shutdown_rx, events));

        Self {
            outbound_tx,
            shutdown_tx,
            task,
        }
    }

    /// Get a sender that enqueues outbound frames.
    ///
    /// Frames enqueued while disconnected are flushed once the connection
    /// comes back.
    pub fn sender(&self) -> mpsc::Sender<String> {
        self.outbound_tx.clone()
    }

    /// Stop the I/O task and close the connection
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

/// Connection supervisor: connect, drive, back off, repeat.
async fn run(
    config: TransportConfig,
    mut outbound_rx: mpsc::Receiver<String>,
    mut shutdown_rx: mpsc::Receiver<()>,
    events: mpsc::Sender<TransportEvent>,
) {
    let mut backoff = config.initial_backoff;

    loop {
        match tokio_tungstenite::connect_async(config.url.as_str()).await {
            Ok((stream, _response)) => {
                tracing::info!(url = %config.url, "Connected to controller API");
                backoff = config.initial_backoff;

                if events.send(TransportEvent::Connected).await.is_err() {
                    return;
                }

                let (mut sink, mut source) = stream.split();
                match drive(
                    &mut sink,
                    &mut source,
                    &mut outbound_rx,
                    &mut shutdown_rx,
                    &events,
                )
                .await
                {
                    LoopExit::Shutdown => {
                        let _ = sink.close().await;
                        return;
                    }
                    LoopExit::Lost(reason) => {
                        tracing::warn!(%reason, "Connection to controller API lost");
                        if events
                            .send(TransportEvent::Disconnected { reason })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                let error = TransportError::ConnectFailed {
                    url: config.url.clone(),
                    reason: e.to_string(),
                };
                tracing::debug!("{}", error);
            }
        }

        tokio::select! {
            _ = shutdown_rx.recv() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(config.max_backoff);
    }
}

/// Pump one established connection until it drops or shutdown is asked.
async fn drive(
    sink: &mut WsSink,
    source: &mut WsSource,
    outbound_rx: &mut mpsc::Receiver<String>,
    shutdown_rx: &mut mpsc::Receiver<()>,
    events: &mpsc::Sender<TransportEvent>,
) -> LoopExit {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => return LoopExit::Shutdown,

            frame = outbound_rx.recv() => match frame {
                Some(text) => {
                    tracing::trace!(frame = %text, "-> controller");
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        return LoopExit::Lost(TransportError::SendFailed {
                            reason: e.to_string(),
                        });
                    }
                }
                // All senders gone; the client handle was dropped.
                None => return LoopExit::Shutdown,
            },

            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    tracing::trace!(frame = %text, "<- controller");
                    if events.send(TransportEvent::Frame(text)).await.is_err() {
                        return LoopExit::Shutdown;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = sink.send(Message::Pong(payload)).await {
                        return LoopExit::Lost(TransportError::SendFailed {
                            reason: e.to_string(),
                        });
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    return LoopExit::Lost(TransportError::ConnectionLost {
                        reason: "closed by server".to_string(),
                    });
                }
                // Binary, pong, raw frames: nothing on this protocol uses them.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return LoopExit::Lost(TransportError::ConnectionLost {
                        reason: e.to_string(),
                    })
                }
                None => {
                    return LoopExit::Lost(TransportError::ConnectionLost {
                        reason: "stream ended".to_string(),
                    })
                }
            },
        }
    }
}
