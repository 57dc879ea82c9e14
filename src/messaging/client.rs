//! Messaging client facade and background connection loop
//!
//! One background tokio task per client instance drives the transport event
//! stream; caller tasks invoke `publish`, `register_handler`, `is_connected`,
//! and `stop` concurrently. Connection state lives in a watch channel so both
//! sides observe a single consistent value, and inbound messages are
//! dispatched synchronously in arrival order by the loop task.
//!
//! There is no automatic reconnect: an unexpected drop lands the client in
//! `Disconnected` and communication resumes only via a fresh `start()`.

use super::connection::{
    ConnectTiming, ConnectionState, QosLevel, StopTiming, DEFAULT_SUBSCRIPTIONS,
};
use super::events::{validate_subscription_success, TransportEvent};
use super::router::TopicRouter;
use super::transport::{MqttTransport, Transport, TransportSink, TransportStream};
use crate::config::ConnectionConfig;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Snapshot of the client's identity and connection state
#[derive(Debug, Clone)]
pub struct ClientStatus {
    pub state: ConnectionState,
    pub broker: String,
    pub port: u16,
    pub client_id: String,
}

/// Publish/subscribe client for edge coordination traffic
pub struct EdgeMessagingClient {
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    router: Arc<TopicRouter>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: Option<watch::Sender<bool>>,
    loop_handle: Option<JoinHandle<()>>,
    sink: Option<Arc<dyn TransportSink>>,
    connect_timing: ConnectTiming,
    stop_timing: StopTiming,
}

impl EdgeMessagingClient {
    /// Create a client over the MQTT transport
    pub fn new(config: ConnectionConfig) -> Self {
        let transport = Arc::new(MqttTransport::new(config.clone()));
        Self::with_transport(config, transport)
    }

    /// Create a client over a custom transport (dependency injection seam)
    pub fn with_transport(config: ConnectionConfig, transport: Arc<dyn Transport>) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        info!(
            "Messaging client initialized for broker: {}:{}",
            config.broker, config.port
        );
        Self {
            config,
            transport,
            router: Arc::new(TopicRouter::new()),
            state_tx,
            state_rx,
            shutdown_tx: None,
            loop_handle: None,
            sink: None,
            connect_timing: ConnectTiming::default(),
            stop_timing: StopTiming::default(),
        }
    }

    /// Override the bounded connect wait (poll interval and attempt count)
    pub fn with_connect_timing(mut self, timing: ConnectTiming) -> Self {
        self.connect_timing = timing;
        self
    }

    /// Override the bounded join wait used by `stop()`
    pub fn with_stop_timing(mut self, timing: StopTiming) -> Self {
        self.stop_timing = timing;
        self
    }

    /// Start the client and wait for the broker acknowledgment.
    ///
    /// Idempotent: if the client is already connecting or connected this logs
    /// and returns without side effects. Otherwise the state moves to
    /// `Connecting`, the background loop is spawned, and the calling task
    /// polls the state at a fixed interval up to a bounded number of
    /// attempts. Returns `true` iff the state reached `Connected` within the
    /// bound; all failures are reported through the result and log output.
    pub async fn start(&mut self) -> bool {
        let current = *self.state_rx.borrow();
        if matches!(
            current,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            info!("start() ignored - client already {:?}", current);
            return current == ConnectionState::Connected;
        }

        info!(
            "Starting messaging client ({}:{} as {})",
            self.config.broker, self.config.port, self.config.client_id
        );
        let _ = self.state_tx.send(ConnectionState::Connecting);

        let (sink, stream) = match self.transport.open().await {
            Ok(pair) => pair,
            Err(e) => {
                error!("Failed to open transport: {}", e);
                let _ = self.state_tx.send(ConnectionState::Failed);
                return false;
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);
        self.sink = Some(sink.clone());

        let handle = tokio::spawn(run_connection_loop(
            stream,
            sink,
            self.router.clone(),
            self.state_tx.clone(),
            shutdown_rx,
        ));
        self.loop_handle = Some(handle);

        // Bounded connect wait: poll the state at a fixed interval
        for _ in 0..self.connect_timing.max_attempts {
            if *self.state_rx.borrow() == ConnectionState::Connected {
                info!("Messaging client started successfully");
                return true;
            }
            tokio::time::sleep(self.connect_timing.poll_interval).await;
        }

        if *self.state_rx.borrow() == ConnectionState::Connected {
            info!("Messaging client started successfully");
            return true;
        }

        error!(
            "Messaging client did not connect within {} attempts (state: {:?})",
            self.connect_timing.max_attempts,
            *self.state_rx.borrow()
        );
        false
    }

    /// Stop the client and release the connection resources.
    ///
    /// Idempotent: a no-op when already disconnected. The background task is
    /// joined with a bounded wait; if the join times out the task is left to
    /// finish on its own (no forced kill) and the state still ends at
    /// `Disconnected`.
    pub async fn stop(&mut self) {
        let current = *self.state_rx.borrow();
        if current == ConnectionState::Disconnected && self.loop_handle.is_none() {
            debug!("stop() ignored - client already disconnected");
            return;
        }

        info!("Stopping messaging client...");
        let _ = self.state_tx.send(ConnectionState::Disconnecting);

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }

        if let Some(sink) = self.sink.take() {
            if let Err(e) = sink.disconnect().await {
                debug!("Transport disconnect during stop: {}", e);
            }
        }

        if let Some(handle) = self.loop_handle.take() {
            match tokio::time::timeout(self.stop_timing.join_timeout, handle).await {
                Ok(Ok(())) => info!("Transport loop shut down cleanly"),
                Ok(Err(e)) => warn!("Transport loop task ended with error: {}", e),
                Err(_) => warn!(
                    "Transport loop did not stop within {:?}; leaving it to finish on its own",
                    self.stop_timing.join_timeout
                ),
            }
        }

        let _ = self.state_tx.send(ConnectionState::Disconnected);
        info!("Messaging client stopped");
    }

    /// Publish with the default delivery settings (QoS 1, not retained)
    pub async fn publish(&self, topic: &str, payload: &[u8]) -> bool {
        self.publish_with(topic, payload, QosLevel::AtLeastOnce, false)
            .await
    }

    /// Publish a message, gated by the connection state.
    ///
    /// Returns `false` without touching the transport when not connected;
    /// otherwise the result reflects the transport's acknowledgment.
    pub async fn publish_with(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QosLevel,
        retain: bool,
    ) -> bool {
        let state = self.state();
        if !state.can_publish() {
            warn!("Cannot publish to {}: client is {:?}", topic, state);
            return false;
        }

        let sink = match &self.sink {
            Some(sink) => sink,
            None => {
                warn!("Cannot publish to {}: no active transport", topic);
                return false;
            }
        };

        match sink.publish(topic, payload, qos, retain).await {
            Ok(()) => {
                debug!("Published message to {}", topic);
                true
            }
            Err(e) => {
                error!("Failed to publish message to {}: {}", topic, e);
                false
            }
        }
    }

    /// Register a handler for a topic (replaces any existing handler)
    pub fn register_handler<F>(&self, topic: &str, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.router.register(topic, handler);
    }

    /// Remove the handler for a topic (no-op if absent)
    pub fn unregister_handler(&self, topic: &str) {
        self.router.unregister(topic);
    }

    /// True iff the state is exactly `Connected`
    pub fn is_connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Connected
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Snapshot of the client identity and state
    pub fn status(&self) -> ClientStatus {
        ClientStatus {
            state: self.state(),
            broker: self.config.broker.clone(),
            port: self.config.port,
            client_id: self.config.client_id.clone(),
        }
    }

    /// Access to the topic router (dispatch counts, handler introspection)
    pub fn router(&self) -> &Arc<TopicRouter> {
        &self.router
    }
}

impl Drop for EdgeMessagingClient {
    fn drop(&mut self) {
        // Signal and detach the background task; graceful shutdown requires
        // an explicit stop() since Drop cannot await.
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }
        if let Some(handle) = self.loop_handle.take() {
            handle.abort();
        }
    }
}

/// Background transport loop, one per successful `start()`.
///
/// Dispatches inbound messages one at a time in arrival order; all transport
/// errors are logged and end the loop. The caller observes the outcome only
/// through the connection state.
async fn run_connection_loop(
    mut stream: Box<dyn TransportStream>,
    sink: Arc<dyn TransportSink>,
    router: Arc<TopicRouter>,
    state_tx: watch::Sender<ConnectionState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!("Transport loop started");
    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Shutdown requested, stopping transport loop");
                    break;
                }
            }
            event = stream.next_event() => {
                match event {
                    Ok(TransportEvent::ConnAck) => {
                        info!("Successfully connected to broker");
                        let _ = state_tx.send(ConnectionState::Connected);
                        subscribe_default_topics(sink.as_ref()).await;
                    }
                    Ok(TransportEvent::Message { topic, payload, retain: _ }) => {
                        router.dispatch(&topic, &payload);
                    }
                    Ok(TransportEvent::SubAck { return_codes }) => {
                        match validate_subscription_success(&return_codes) {
                            Ok(()) => debug!("Subscription confirmed: {:?}", return_codes),
                            Err(e) => error!("{}", e),
                        }
                    }
                    Ok(TransportEvent::Disconnected) => {
                        warn!("Broker closed the connection");
                        record_loop_exit(&state_tx);
                        break;
                    }
                    Ok(TransportEvent::Other(event)) => {
                        debug!("Transport event: {}", event);
                    }
                    Err(e) => {
                        error!("Transport loop error: {}", e);
                        record_loop_exit(&state_tx);
                        break;
                    }
                }
            }
        }
    }
    debug!("Transport loop stopped");
}

/// Subscribe to the built-in topic set in fixed order.
/// A failed subscription is logged and does not abort the remaining topics.
async fn subscribe_default_topics(sink: &dyn TransportSink) {
    for (topic, qos) in DEFAULT_SUBSCRIPTIONS {
        match sink.subscribe(topic, qos).await {
            Ok(()) => info!("Subscribed to topic: {} with QoS: {}", topic, qos.as_u8()),
            Err(e) => error!("Failed to subscribe to topic {}: {}", topic, e),
        }
    }
}

/// Downgrade the state when the loop ends unexpectedly. A stop in progress
/// owns the final transition to `Disconnected`.
fn record_loop_exit(state_tx: &watch::Sender<ConnectionState>) {
    let next = match *state_tx.borrow() {
        ConnectionState::Connecting => ConnectionState::Failed,
        ConnectionState::Disconnecting => return,
        _ => ConnectionState::Disconnected,
    };
    let _ = state_tx.send(next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::connection::MessagingError;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn open(
            &self,
        ) -> Result<(Arc<dyn TransportSink>, Box<dyn TransportStream>), MessagingError> {
            Err(MessagingError::ConnectionFailed(
                "broker unreachable".to_string(),
            ))
        }
    }

    fn test_config() -> ConnectionConfig {
        ConnectionConfig {
            broker: "localhost".to_string(),
            port: 1883,
            keepalive_secs: 60,
            client_id: "test-client".to_string(),
            username: None,
            password: None,
        }
    }

    fn fast_timing() -> ConnectTiming {
        ConnectTiming {
            poll_interval: Duration::from_millis(5),
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_disconnected() {
        let client = EdgeMessagingClient::new(test_config());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_start_fails_when_transport_open_fails() {
        let mut client =
            EdgeMessagingClient::with_transport(test_config(), Arc::new(FailingTransport))
                .with_connect_timing(fast_timing());

        assert!(!client.start().await);
        assert_eq!(client.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn test_publish_before_start_returns_false() {
        let client = EdgeMessagingClient::new(test_config());
        assert!(!client.publish("edge/status", b"up").await);
    }

    #[tokio::test]
    async fn test_stop_on_fresh_client_is_noop() {
        let mut client = EdgeMessagingClient::new(test_config());
        client.stop().await;
        client.stop().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let client = EdgeMessagingClient::new(test_config());
        let status = client.status();
        assert_eq!(status.state, ConnectionState::Disconnected);
        assert_eq!(status.broker, "localhost");
        assert_eq!(status.port, 1883);
        assert_eq!(status.client_id, "test-client");
    }

    #[test]
    fn test_record_loop_exit_transitions() {
        let (tx, rx) = watch::channel(ConnectionState::Connecting);
        record_loop_exit(&tx);
        assert_eq!(*rx.borrow(), ConnectionState::Failed);

        let (tx, rx) = watch::channel(ConnectionState::Connected);
        record_loop_exit(&tx);
        assert_eq!(*rx.borrow(), ConnectionState::Disconnected);

        // A stop in progress keeps ownership of the final transition
        let (tx, rx) = watch::channel(ConnectionState::Disconnecting);
        record_loop_exit(&tx);
        assert_eq!(*rx.borrow(), ConnectionState::Disconnecting);
    }
}
