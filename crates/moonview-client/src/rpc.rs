//! JSON-RPC wire types and request/response correlation
//!
//! Every outgoing call carries a process-unique integer id. The
//! [`Correlator`] keeps a pending table from id to a single-shot
//! completion channel; an inbound response removes the entry and
//! completes it exactly once. A response with an unknown, late, or
//! duplicate id completes nothing and is logged, never fatal.
//!
//! Delivery is at-most-once: when the connection drops, every pending
//! entry is purged and completed with [`RpcError::Disconnected`]. Nothing
//! is retried across a reconnect.

use moonview_core::RpcError;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

/// Outcome of a single RPC call
pub type CallOutcome = std::result::Result<Value, RpcError>;

/// An outgoing JSON-RPC request frame
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    /// Protocol version marker, always "2.0"
    pub jsonrpc: &'static str,
    /// Method name
    pub method: &'a str,
    /// Optional parameters object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Correlation id
    pub id: u64,
}

impl<'a> RpcRequest<'a> {
    /// Build a request frame
    pub fn new(method: &'a str, params: Option<Value>, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id,
        }
    }

    /// Serialize to a single text frame
    pub fn to_frame(&self) -> String {
        // RpcRequest has no non-serializable fields; this cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A classified inbound frame
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// RPC response, matched to a pending call by id
    Response {
        /// Correlation id of the originating call.
        id: u64,
        /// `Ok(result)` or the server-reported error.
        outcome: CallOutcome,
    },
    /// Unsolicited server notification
    Notification {
        /// Notification method name.
        method: String,
        /// Positional parameters; for status updates the delta is first.
        params: Vec<Value>,
    },
}

/// Classify one inbound text frame.
///
/// A frame carrying a `method` is a notification; a frame carrying an
/// `id` is a response. Anything else is a protocol fault.
pub fn classify_frame(text: &str) -> Result<InboundFrame, RpcError> {
    let value: Value = serde_json::from_str(text).map_err(|e| RpcError::MalformedResponse {
        reason: e.to_string(),
    })?;

    if let Some(method) = value.get("method").and_then(Value::as_str) {
        let params = match value.get("params") {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        };
        return Ok(InboundFrame::Notification {
            method: method.to_string(),
            params,
        });
    }

    let id = value
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::MalformedResponse {
            reason: "frame has neither method nor integer id".to_string(),
        })?;

    let outcome = if let Some(error) = value.get("error") {
        Err(RpcError::Server {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        })
    } else {
        Ok(value.get("result").cloned().unwrap_or(Value::Null))
    };

    Ok(InboundFrame::Response { id, outcome })
}

/// A call waiting for its response
struct PendingCall {
    method: String,
    tx: oneshot::Sender<CallOutcome>,
}

/// Matches RPC responses to their originating call by id.
///
/// Ids increase monotonically for the process lifetime and are never
/// reused while a call with that id is outstanding. Fire-and-forget
/// calls take an id for the wire but register nothing.
pub struct Correlator {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingCall>>,
}

impl Correlator {
    /// Create an empty correlator
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate the next wire id without tracking it (fire-and-forget)
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a pending call and hand back its completion receiver.
    ///
    /// The receiver resolves exactly once: with the response outcome, or
    /// with [`RpcError::Disconnected`] when the connection drops first.
    pub fn register(&self, method: &str) -> (u64, oneshot::Receiver<CallOutcome>) {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(
            id,
            PendingCall {
                method: method.to_string(),
                tx,
            },
        );
        (id, rx)
    }

    /// Complete the pending call with this id.
    ///
    /// Returns false for an unknown id (late, duplicate, or never
    /// tracked); the caller logs and drops such frames.
    pub fn complete(&self, id: u64, outcome: CallOutcome) -> bool {
        let entry = self.pending.lock().remove(&id);
        match entry {
            Some(call) => {
                if call.tx.send(outcome).is_err() {
                    // Caller dropped its receiver before the response
                    // arrived; nothing to deliver to.
                    tracing::trace!(id, method = %call.method, "Response for abandoned call");
                }
                true
            }
            None => false,
        }
    }

    /// Purge every pending call, completing each with `error`.
    ///
    /// Returns how many calls were purged.
    pub fn fail_all(&self, error: RpcError) -> usize {
        let drained: Vec<PendingCall> = {
            let mut pending = self.pending.lock();
            pending.drain().map(|(_, call)| call).collect()
        };
        let count = drained.len();
        for call in drained {
            tracing::debug!(method = %call.method, "Failing pending call: {}", error);
            let _ = call.tx.send(Err(error.clone()));
        }
        count
    }

    /// Number of calls currently outstanding
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending_count())
            .finish()
    }
}
