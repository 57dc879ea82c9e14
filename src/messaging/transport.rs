//! Transport seam between the messaging client and the broker protocol
//!
//! The client talks to a pair of objects per connection: a cloneable sink for
//! outbound operations and a stream of tagged inbound events. The production
//! implementation wraps the rumqttc v5 client; tests substitute a scripted
//! pair to simulate a broker.

use super::connection::{MessagingError, QosLevel};
use super::events::{route_event, TransportEvent};
use crate::config::ConnectionConfig;
use async_trait::async_trait;
use rumqttc::v5::{AsyncClient, EventLoop, MqttOptions};
use std::sync::Arc;
use std::time::Duration;

/// Outbound half of a broker connection
#[async_trait]
pub trait TransportSink: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QosLevel,
        retain: bool,
    ) -> Result<(), MessagingError>;

    async fn subscribe(&self, topic: &str, qos: QosLevel) -> Result<(), MessagingError>;

    async fn disconnect(&self) -> Result<(), MessagingError>;
}

/// Inbound half of a broker connection
#[async_trait]
pub trait TransportStream: Send {
    /// Wait for the next transport event. An error ends the connection loop.
    async fn next_event(&mut self) -> Result<TransportEvent, MessagingError>;
}

/// Factory opening a fresh sink/stream pair per connection attempt
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(
        &self,
    ) -> Result<(Arc<dyn TransportSink>, Box<dyn TransportStream>), MessagingError>;
}

/// Build MQTT options from the connection configuration (pure function)
pub fn configure_mqtt_options(config: &ConnectionConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
    options.set_keep_alive(Duration::from_secs(config.keepalive_secs));

    if let Some(username) = &config.username {
        let password = config.password.clone().unwrap_or_default();
        options.set_credentials(username, password);
    }

    options
}

/// MQTT transport backed by rumqttc
pub struct MqttTransport {
    config: ConnectionConfig,
}

impl MqttTransport {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn open(
        &self,
    ) -> Result<(Arc<dyn TransportSink>, Box<dyn TransportStream>), MessagingError> {
        let options = configure_mqtt_options(&self.config);
        let (client, event_loop) = AsyncClient::new(options, 10);
        Ok((
            Arc::new(MqttSink { client }),
            Box::new(MqttStream { event_loop }),
        ))
    }
}

struct MqttSink {
    client: AsyncClient,
}

#[async_trait]
impl TransportSink for MqttSink {
    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QosLevel,
        retain: bool,
    ) -> Result<(), MessagingError> {
        self.client
            .publish(topic, qos.into(), retain, payload.to_vec())
            .await
            .map_err(|e| MessagingError::PublishFailed(Box::new(e)))
    }

    async fn subscribe(&self, topic: &str, qos: QosLevel) -> Result<(), MessagingError> {
        self.client
            .subscribe(topic, qos.into())
            .await
            .map_err(|e| MessagingError::SubscriptionFailed(Box::new(e)))
    }

    async fn disconnect(&self) -> Result<(), MessagingError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| MessagingError::ConnectionFailed(e.to_string()))
    }
}

struct MqttStream {
    event_loop: EventLoop,
}

#[async_trait]
impl TransportStream for MqttStream {
    async fn next_event(&mut self) -> Result<TransportEvent, MessagingError> {
        let event = self
            .event_loop
            .poll()
            .await
            .map_err(|e| MessagingError::ConnectionFailed(e.to_string()))?;
        Ok(route_event(&event))
    }
}
