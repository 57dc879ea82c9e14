//! Integration tests for the messaging client lifecycle
//!
//! Drives the real client and background loop against a scripted transport
//! that plays the broker's role, so the lifecycle, subscription, dispatch,
//! and publish gating paths run end to end without a network.

use edge_deploy::config::ConnectionConfig;
use edge_deploy::messaging::{ConnectTiming, ConnectionState, EdgeMessagingClient, StopTiming};
use edge_deploy::testing::mocks::ScriptedTransport;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn test_config() -> ConnectionConfig {
    ConnectionConfig {
        broker: "localhost".to_string(),
        port: 1883,
        keepalive_secs: 60,
        client_id: "test".to_string(),
        username: None,
        password: None,
    }
}

fn fast_client(transport: Arc<ScriptedTransport>) -> EdgeMessagingClient {
    EdgeMessagingClient::with_transport(test_config(), transport)
        .with_connect_timing(ConnectTiming {
            poll_interval: Duration::from_millis(5),
            max_attempts: 20,
        })
        .with_stop_timing(StopTiming {
            join_timeout: Duration::from_millis(500),
        })
}

/// Poll until the condition holds or the deadline passes
async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[tokio::test]
async fn test_start_succeeds_against_acknowledging_broker() {
    let transport = ScriptedTransport::acknowledging();
    let mut client = fast_client(transport);

    assert!(client.start().await);
    assert!(client.is_connected());
    assert_eq!(client.state(), ConnectionState::Connected);

    let status = client.status();
    assert_eq!(status.broker, "localhost");
    assert_eq!(status.port, 1883);
    assert_eq!(status.client_id, "test");

    client.stop().await;
}

#[tokio::test]
async fn test_start_times_out_against_silent_broker() {
    let transport = ScriptedTransport::silent();
    let mut client = EdgeMessagingClient::with_transport(test_config(), transport)
        .with_connect_timing(ConnectTiming {
            poll_interval: Duration::from_millis(5),
            max_attempts: 3,
        });

    assert!(!client.start().await);
    assert!(!client.is_connected());
    assert_ne!(client.state(), ConnectionState::Connected);

    client.stop().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_start_is_idempotent_while_connected() {
    let transport = ScriptedTransport::acknowledging();
    let mut client = fast_client(transport.clone());

    assert!(client.start().await);
    // A second start must not reopen the transport
    assert!(client.start().await);
    assert!(client.is_connected());

    client.stop().await;
}

#[tokio::test]
async fn test_connect_subscribes_to_default_topics_in_order() {
    let transport = ScriptedTransport::acknowledging();
    let mut client = fast_client(transport.clone());

    assert!(client.start().await);

    let subscriptions = transport.subscriptions().await;
    assert_eq!(
        subscriptions,
        vec![
            ("edge/deployments".to_string(), 1),
            ("edge/status".to_string(), 1),
            ("edge/commands".to_string(), 1),
            ("edge/logs".to_string(), 0),
        ]
    );

    client.stop().await;
}

#[tokio::test]
async fn test_registered_handler_receives_payload_once() {
    let transport = ScriptedTransport::acknowledging();
    let mut client = fast_client(transport.clone());

    let received: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let received_clone = received.clone();
    client.register_handler("edge/commands", move |payload| {
        received_clone.lock().unwrap().push(payload.to_string());
    });

    assert!(client.start().await);
    transport.inject_message("edge/commands", b"restart");

    let received_check = received.clone();
    assert!(wait_until(move || !received_check.lock().unwrap().is_empty()).await);
    assert_eq!(*received.lock().unwrap(), vec!["restart".to_string()]);
    assert_eq!(client.router().dispatch_count("edge/commands"), 1);

    client.stop().await;
}

#[tokio::test]
async fn test_reregistration_replaces_previous_handler() {
    let transport = ScriptedTransport::acknowledging();
    let mut client = fast_client(transport.clone());

    let first_calls = Arc::new(AtomicU32::new(0));
    let second_calls = Arc::new(AtomicU32::new(0));

    let first = first_calls.clone();
    client.register_handler("edge/status", move |_| {
        first.fetch_add(1, Ordering::SeqCst);
    });
    let second = second_calls.clone();
    client.register_handler("edge/status", move |_| {
        second.fetch_add(1, Ordering::SeqCst);
    });

    assert!(client.start().await);
    transport.inject_message("edge/status", b"healthy");

    let observed = second_calls.clone();
    assert!(wait_until(move || observed.load(Ordering::SeqCst) == 1).await);
    assert_eq!(first_calls.load(Ordering::SeqCst), 0);

    client.stop().await;
}

#[tokio::test]
async fn test_publish_while_disconnected_touches_nothing() {
    let transport = ScriptedTransport::silent();
    let client = EdgeMessagingClient::with_transport(test_config(), transport.clone());

    assert!(!client.publish("edge/status", b"hello").await);
    assert!(transport.published().await.is_empty());
}

#[tokio::test]
async fn test_publish_when_connected_reaches_transport() {
    let transport = ScriptedTransport::acknowledging();
    let mut client = fast_client(transport.clone());

    assert!(client.start().await);
    assert!(client.publish("edge/status", b"healthy").await);

    let published = transport.published().await;
    assert_eq!(published.len(), 1);
    let (topic, payload, qos, retain) = &published[0];
    assert_eq!(topic, "edge/status");
    assert_eq!(payload, b"healthy");
    assert_eq!(*qos, 1);
    assert!(!retain);

    client.stop().await;
}

#[tokio::test]
async fn test_publish_failure_reports_false() {
    let transport = ScriptedTransport::with_failing_publishes();
    let mut client = fast_client(transport.clone());

    assert!(client.start().await);
    assert!(!client.publish("edge/status", b"healthy").await);

    client.stop().await;
}

#[tokio::test]
async fn test_stop_is_idempotent_and_disconnects_transport() {
    let transport = ScriptedTransport::acknowledging();
    let mut client = fast_client(transport.clone());

    assert!(client.start().await);

    client.stop().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(!client.is_connected());
    assert_eq!(transport.disconnect_count().await, 1);

    client.stop().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(transport.disconnect_count().await, 1);
}

#[tokio::test]
async fn test_broker_disconnect_lands_disconnected_without_reconnect() {
    let transport = ScriptedTransport::acknowledging();
    let mut client = fast_client(transport.clone());

    assert!(client.start().await);
    transport.inject_disconnect();

    assert!(
        wait_until(|| client.state() == ConnectionState::Disconnected).await,
        "client should settle in Disconnected after a broker-side drop"
    );

    // No reconnect happens on its own
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(!client.publish("edge/status", b"late").await);

    client.stop().await;
}

#[tokio::test]
async fn test_unhandled_message_falls_back_to_default_handling() {
    let transport = ScriptedTransport::acknowledging();
    let mut client = fast_client(transport.clone());

    assert!(client.start().await);

    // No handler registered for edge/commands; the message is still
    // counted and the connection survives.
    transport.inject_message("edge/commands", b"restart");

    let router = client.router().clone();
    assert!(wait_until(move || router.dispatch_count("edge/commands") == 1).await);
    assert!(client.is_connected());

    client.stop().await;
}
