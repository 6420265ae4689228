//! Pending-call lifecycle tests

use moonview_client::Correlator;
use moonview_core::RpcError;
use serde_json::json;

#[tokio::test]
async fn test_each_call_completes_at_most_once_and_only_for_its_id() {
    let correlator = Correlator::new();
    let (id_a, rx_a) = correlator.register("printer.info");
    let (id_b, rx_b) = correlator.register("server.info");

    // A response with an unknown id completes nothing.
    assert!(!correlator.complete(id_b + 100, Ok(json!("stray"))));
    assert_eq!(correlator.pending_count(), 2);

    assert!(correlator.complete(id_b, Ok(json!({"which": "b"}))));
    assert!(correlator.complete(id_a, Ok(json!({"which": "a"}))));

    assert_eq!(rx_a.await.unwrap().unwrap()["which"], "a");
    assert_eq!(rx_b.await.unwrap().unwrap()["which"], "b");

    // Duplicates find no entry; nothing fires twice.
    assert!(!correlator.complete(id_a, Ok(json!(null))));
    assert_eq!(correlator.pending_count(), 0);
}

#[tokio::test]
async fn test_disconnect_purges_all_pending_calls() {
    let correlator = Correlator::new();
    let (id_a, rx_a) = correlator.register("printer.print.pause");
    let (_id_b, rx_b) = correlator.register("printer.info");
    let (_id_c, rx_c) = correlator.register("server.files.metadata");
    assert_eq!(correlator.pending_count(), 3);

    let purged = correlator.fail_all(RpcError::Disconnected);
    assert_eq!(purged, 3);
    assert_eq!(correlator.pending_count(), 0);

    // Every caller observes the typed failure, exactly once.
    assert_eq!(rx_a.await.unwrap().unwrap_err(), RpcError::Disconnected);
    assert_eq!(rx_b.await.unwrap().unwrap_err(), RpcError::Disconnected);
    assert_eq!(rx_c.await.unwrap().unwrap_err(), RpcError::Disconnected);

    // A response arriving for a purged id after reconnect is unknown.
    assert!(!correlator.complete(id_a, Ok(json!(null))));
}

#[test]
fn test_ids_survive_purge_without_reuse() {
    let correlator = Correlator::new();
    let (before, _rx) = correlator.register("one");
    correlator.fail_all(RpcError::Disconnected);
    let (after, _rx) = correlator.register("two");
    assert!(after > before, "ids must keep increasing across purges");
}
