//! Live loopback tests against a local websocket server
//!
//! Each test binds an ephemeral TCP port, runs a scripted
//! `accept_async` server on it, and drives a real [`PrinterClient`]
//! through the full connect / call / notify / drop cycle.

use futures_util::{SinkExt, StreamExt};
use moonview_client::{ConnectionEvent, Fanout, NotifyConsumer, PrinterClient};
use moonview_core::{RpcError, Settings, StateStore};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

fn settings_for(port: u16) -> Settings {
    let mut settings = Settings::default();
    settings.endpoint = format!("ws://127.0.0.1:{}/websocket", port);
    settings.reconnect.initial_delay_ms = 50;
    settings.reconnect.max_delay_ms = 200;
    settings
}

fn new_fanout() -> Arc<Fanout> {
    Fanout::new(Arc::new(Mutex::new(StateStore::new())))
}

struct DeltaRecorder {
    deltas: Arc<Mutex<Vec<Value>>>,
}

impl NotifyConsumer for DeltaRecorder {
    fn consume(&mut self, delta: &Value, _store: &StateStore) {
        self.deltas.lock().push(delta.clone());
    }
}

/// Poll `cond` until it holds or two seconds elapse.
async fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {}", what);
}

/// Receive events until `expected` shows up, within two seconds.
async fn expect_event(rx: &mut broadcast::Receiver<ConnectionEvent>, expected: ConnectionEvent) {
    let deadline = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(event) if event == expected => break,
                Ok(_) => continue,
                Err(e) => panic!("event channel failed: {}", e),
            }
        }
    });
    deadline
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}", expected));
}

fn response_for(request: &str) -> Option<String> {
    let frame: Value = serde_json::from_str(request).ok()?;
    let id = frame.get("id").and_then(Value::as_u64)?;
    Some(json!({"jsonrpc": "2.0", "result": {"state": "ready"}, "id": id}).to_string())
}

#[tokio::test]
async fn test_call_roundtrip_and_status_update() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        // Unsolicited push before any request arrives.
        let notification = json!({
            "jsonrpc": "2.0",
            "method": "notify_status_update",
            "params": [{"extruder": {"temperature": 201.5}}, 123.0],
        });
        ws.send(Message::Text(notification.to_string()))
            .await
            .unwrap();

        // Answer requests until the client hangs up.
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                if let Some(reply) = response_for(&text) {
                    if ws.send(Message::Text(reply)).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let fanout = new_fanout();
    let deltas = Arc::new(Mutex::new(Vec::new()));
    let _handle = fanout.register(Arc::new(Mutex::new(DeltaRecorder {
        deltas: deltas.clone(),
    })));

    let client = PrinterClient::connect(&settings_for(port), fanout.clone());

    let outcome = tokio::time::timeout(Duration::from_secs(2), client.call("printer.info", None))
        .await
        .expect("call timed out")
        .expect("call failed");
    assert_eq!(outcome["state"], "ready");

    wait_for("status update delivery", || !deltas.lock().is_empty()).await;
    assert_eq!(
        deltas.lock()[0]["extruder"]["temperature"],
        json!(201.5),
        "consumer must see the raw delta"
    );
    assert_eq!(
        fanout.with_store(|s| s.get_f64("printer_state/extruder/temperature")),
        Some(201.5),
        "store must be updated before consumers run"
    );

    client.shutdown().await;
    server.abort();
}

#[tokio::test]
async fn test_disconnect_purges_pending_and_client_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        // First connection: swallow three requests, then drop the socket.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut seen = 0;
        while seen < 3 {
            match ws.next().await {
                Some(Ok(Message::Text(_))) => seen += 1,
                Some(Ok(_)) => continue,
                _ => panic!("client hung up before three requests"),
            }
        }
        drop(ws);

        // Second connection: behave normally.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                if let Some(reply) = response_for(&text) {
                    if ws.send(Message::Text(reply)).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let client = PrinterClient::connect(&settings_for(port), new_fanout());
    let mut events = client.subscribe_events();

    let (a, b, c) = tokio::join!(
        client.call("printer.print.pause", None),
        client.call("printer.info", None),
        client.call("server.files.metadata", Some(json!({"filename": "part.gcode"}))),
    );
    assert_eq!(a.unwrap_err(), RpcError::Disconnected);
    assert_eq!(b.unwrap_err(), RpcError::Disconnected);
    assert_eq!(c.unwrap_err(), RpcError::Disconnected);
    assert_eq!(client.pending_calls(), 0, "purge must leave no entries");

    // The drop and the subsequent reconnect are both observable.
    expect_event(&mut events, ConnectionEvent::Disconnected).await;
    expect_event(&mut events, ConnectionEvent::Connected).await;

    // Fresh calls on the new connection work again.
    let outcome = tokio::time::timeout(Duration::from_secs(2), client.call("printer.info", None))
        .await
        .expect("call timed out")
        .expect("call after reconnect failed");
    assert_eq!(outcome["state"], "ready");

    client.shutdown().await;
    server.abort();
}
