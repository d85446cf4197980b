//! End-to-end session scenarios: a UI proxy driven through a full client,
//! with the broker side simulated over the channel pair.

use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

use buslink::proxy::{UiProxy, VR_ON_CHOICE};
use buslink::{transport, ResultCode, RpcClient, SessionState};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(raw) = rx.try_recv() {
        out.push(serde_json::from_str(&raw).unwrap());
    }
    out
}

fn wire(envelope: Value) -> String {
    serde_json::to_string(&envelope).unwrap()
}

/// Connect a UI client and play the broker's registration ack into it.
/// Returns the client, the outbound receiver (registration and subscribe
/// frames already consumed), and the register request id.
fn registered_ui_client() -> (RpcClient<UiProxy>, UnboundedReceiver<String>) {
    init_tracing();
    let (link, mut outbound) = transport::link();
    let mut client = RpcClient::new("UI", UiProxy::new(), link);
    client.connect(Duration::from_secs(3)).unwrap();

    let frames = drain(&mut outbound);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["method"], "MB.registerComponent");
    assert_eq!(frames[0]["params"]["componentName"], "UI");
    let register_id = frames[0]["id"].as_u64().unwrap();

    client.handle_raw(&wire(json!({
        "jsonrpc": "2.0",
        "id": register_id,
        "result": 100,
    })));
    assert_eq!(client.session().state(), SessionState::Registered);

    // Registration immediately subscribes to the VR choice topic, using
    // the request-id base the ack handed out.
    let frames = drain(&mut outbound);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["method"], "MB.subscribeTo");
    assert_eq!(frames[0]["params"]["propertyName"], VR_ON_CHOICE);
    assert_eq!(frames[0]["id"], 100);

    (client, outbound)
}

#[test]
fn test_session_lifecycle() {
    let (mut client, mut outbound) = registered_ui_client();
    assert!(client.session().is_subscribed(VR_ON_CHOICE));

    // A request from the core is answered with one result envelope.
    client.handle_raw(&wire(json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "UI.AddCommand",
        "params": { "appId": 1, "cmdId": 42, "menuParams": { "menuName": "Options" } },
    })));

    let frames = drain(&mut outbound);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["id"], 7);
    assert_eq!(frames[0]["result"]["code"], 0);
    assert_eq!(frames[0]["result"]["method"], "UI.AddCommand");

    client.disconnect();
    assert_eq!(client.session().state(), SessionState::Disconnected);
    assert!(!client.session().is_subscribed(VR_ON_CHOICE));

    // Teardown sends the unsubscribe (via the proxy) then the unregister
    // notice.
    let frames = drain(&mut outbound);
    let methods: Vec<&str> = frames
        .iter()
        .map(|f| f["method"].as_str().unwrap())
        .collect();
    assert!(methods.contains(&"MB.unregisterComponent"));
}

#[test]
fn test_interaction_completed_by_vr_choice() {
    let (mut client, mut outbound) = registered_ui_client();

    client.handle_raw(&wire(json!({
        "jsonrpc": "2.0",
        "id": 5,
        "method": "UI.PerformInteraction",
        "params": { "appId": 1, "interactionChoiceSetIDList": [3] },
    })));
    // Deferred: nothing goes out until the user (or VR) picks.
    assert!(outbound.try_recv().is_err());

    client.handle_raw(&wire(json!({
        "jsonrpc": "2.0",
        "method": "VR.OnChoice",
        "params": { "choiceID": 42 },
    })));

    let frames = drain(&mut outbound);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["id"], 5);
    assert_eq!(frames[0]["result"]["choiceID"], 42);
    assert_eq!(frames[0]["result"]["method"], "UI.PerformInteraction");
}

#[test]
fn test_deferred_alert_resolved_through_client() {
    let (mut client, mut outbound) = registered_ui_client();

    client.handle_raw(&wire(json!({
        "jsonrpc": "2.0",
        "id": 12,
        "method": "UI.Alert",
        "params": { "alertText1": "Low fuel" },
    })));
    assert!(outbound.try_recv().is_err());

    // Host-side dismissal reaches the proxy through the observer accessor.
    client
        .with_observer(|proxy, ctx| proxy.alert_response(ctx, ResultCode::Aborted))
        .unwrap();

    let frames = drain(&mut outbound);
    assert_eq!(frames[0]["id"], 12);
    assert_eq!(frames[0]["result"]["code"], ResultCode::Aborted.as_i32());
}

#[test]
fn test_disconnect_voids_deferred_replies() {
    let (mut client, mut outbound) = registered_ui_client();

    client.handle_raw(&wire(json!({
        "jsonrpc": "2.0",
        "id": 12,
        "method": "UI.Alert",
        "params": { "alertText1": "Low fuel" },
    })));
    assert_eq!(client.with_observer(|proxy, _ctx| proxy.deferred_count()), 1);

    client.disconnect();

    // The dead session's request ids must not leak onto a later one.
    assert_eq!(client.with_observer(|proxy, _ctx| proxy.deferred_count()), 0);
    let _ = drain(&mut outbound);
    let err = client
        .with_observer(|proxy, ctx| proxy.alert_response(ctx, ResultCode::Success))
        .unwrap_err();
    assert!(matches!(err, buslink::BuslinkError::NoPendingInteraction(_)));
    assert!(outbound.try_recv().is_err());
}

#[test]
fn test_registration_rejected_by_bus() {
    init_tracing();
    let (link, mut outbound) = transport::link();
    let mut client = RpcClient::new("UI", UiProxy::new(), link);
    client.connect(Duration::from_secs(3)).unwrap();

    let frames = drain(&mut outbound);
    let register_id = frames[0]["id"].as_u64().unwrap();

    client.handle_raw(&wire(json!({
        "jsonrpc": "2.0",
        "id": register_id,
        "error": { "code": -32601, "message": "component name in use" },
    })));

    assert_eq!(client.session().state(), SessionState::Disconnected);
    assert_eq!(client.session().pending_count(), 0);
    // No subscription was ever attempted.
    assert!(outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_run_loop_processes_frames_in_order() {
    init_tracing();
    let (link, mut outbound) = transport::link();
    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut client = RpcClient::new("UI", UiProxy::new(), link);
    client.connect(Duration::from_secs(3)).unwrap();

    let frames = drain(&mut outbound);
    let register_id = frames[0]["id"].as_u64().unwrap();

    inbound_tx
        .send(wire(json!({ "jsonrpc": "2.0", "id": register_id, "result": 100 })))
        .unwrap();
    inbound_tx
        .send(wire(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "UI.AddCommand",
            "params": { "appId": 1, "cmdId": 1 },
        })))
        .unwrap();
    inbound_tx
        .send(wire(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "UI.DeleteCommand",
            "params": { "appId": 1, "cmdId": 1 },
        })))
        .unwrap();
    drop(inbound_tx);

    let client = client.run(inbound_rx).await;

    // Channel closure tears the session down.
    assert_eq!(client.session().state(), SessionState::Disconnected);

    let frames = drain(&mut outbound);
    // subscribe, then the two replies, strictly in arrival order.
    assert_eq!(frames[0]["method"], "MB.subscribeTo");
    assert_eq!(frames[1]["id"], 2);
    assert_eq!(frames[1]["result"]["method"], "UI.AddCommand");
    assert_eq!(frames[2]["id"], 3);
    assert_eq!(frames[2]["result"]["method"], "UI.DeleteCommand");
    assert_eq!(frames[2]["result"]["code"], 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_registration_timeout() {
    init_tracing();
    let (link, mut outbound) = transport::link();
    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut client = RpcClient::new("UI", UiProxy::new(), link);
    client.connect(Duration::from_millis(200)).unwrap();

    let handle = tokio::spawn(client.run(inbound_rx));
    // The paused clock jumps straight past the deadline.
    tokio::time::sleep(Duration::from_millis(300)).await;
    drop(inbound_tx);

    let client = handle.await.unwrap();
    assert_eq!(client.session().state(), SessionState::Disconnected);
    assert_eq!(client.session().pending_count(), 0);

    // Only the registration request ever went out.
    let frames = drain(&mut outbound);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["method"], "MB.registerComponent");
}
