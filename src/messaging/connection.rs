//! Connection state machine types and lifecycle timing bounds
//!
//! The connection state is a tagged enum owned by the client and mutated only
//! by the lifecycle methods and the background transport loop, with transport
//! events delivered as values over an internal channel rather than callback
//! re-entrancy into shared state.

use thiserror::Error;

/// Connection state for the messaging client
///
/// Exactly one active state per client instance. Transitions:
///
/// - `Disconnected --start()--> Connecting`
/// - `Connecting --broker ack--> Connected`
/// - `Connecting --ack failure / timeout--> Failed`
/// - `Connected --unexpected drop--> Disconnected` (no automatic reconnect)
/// - `Connected | Connecting --stop()--> Disconnecting --> Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no background loop running
    Disconnected,
    /// Background loop launched, waiting for the broker acknowledgment
    Connecting,
    /// Broker acknowledged; publish and dispatch are live
    Connected,
    /// stop() in progress
    Disconnecting,
    /// Connection attempt failed (broker unreachable, auth rejected, timeout)
    Failed,
}

impl ConnectionState {
    /// True iff publishing is allowed in this state
    pub fn can_publish(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Delivery guarantee level, 0 (at-most-once) through 2 (exactly-once)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosLevel {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QosLevel {
    /// Numeric protocol level
    pub fn as_u8(&self) -> u8 {
        match self {
            QosLevel::AtMostOnce => 0,
            QosLevel::AtLeastOnce => 1,
            QosLevel::ExactlyOnce => 2,
        }
    }
}

impl From<QosLevel> for rumqttc::v5::mqttbytes::QoS {
    fn from(qos: QosLevel) -> Self {
        use rumqttc::v5::mqttbytes::QoS;
        match qos {
            QosLevel::AtMostOnce => QoS::AtMostOnce,
            QosLevel::AtLeastOnce => QoS::AtLeastOnce,
            QosLevel::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

/// Built-in subscription set, applied in this order on every successful
/// connect. Not configurable.
pub const DEFAULT_SUBSCRIPTIONS: [(&str, QosLevel); 4] = [
    ("edge/deployments", QosLevel::AtLeastOnce),
    ("edge/status", QosLevel::AtLeastOnce),
    ("edge/commands", QosLevel::AtLeastOnce),
    ("edge/logs", QosLevel::AtMostOnce),
];

/// Bounds for the connect wait in `start()`
#[derive(Debug, Clone)]
pub struct ConnectTiming {
    /// Interval between state polls
    pub poll_interval: std::time::Duration,
    /// Maximum number of polling attempts before giving up
    pub max_attempts: u32,
}

impl Default for ConnectTiming {
    fn default() -> Self {
        Self {
            poll_interval: std::time::Duration::from_secs(1),
            max_attempts: 10,
        }
    }
}

/// Bounds for the background task join in `stop()`
#[derive(Debug, Clone)]
pub struct StopTiming {
    /// Maximum wait for the background loop to finish
    pub join_timeout: std::time::Duration,
}

impl Default for StopTiming {
    fn default() -> Self {
        Self {
            join_timeout: std::time::Duration::from_secs(5),
        }
    }
}

/// Messaging transport errors
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Publishing failed")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Subscription failed")]
    SubscriptionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Transport stream ended: {0}")]
    StreamEnded(String),
}
