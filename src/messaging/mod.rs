//! Publish/subscribe messaging core for edge coordination
//!
//! A persistent-connection MQTT client that broadcasts deployment events and
//! receives remote commands. The module is split by concern:
//!
//! - [`connection`] - connection state machine, timing bounds, built-in topics
//! - [`events`] - tagged transport events and pure MQTT event routing
//! - [`router`] - topic-to-handler dispatch with built-in defaults
//! - [`transport`] - sink/stream seam and the rumqttc implementation
//! - [`client`] - the facade and the background connection loop
//!
//! # Usage
//!
//! ```rust,no_run
//! use edge_deploy::config::ConnectionConfig;
//! use edge_deploy::messaging::EdgeMessagingClient;
//!
//! # tokio_test::block_on(async {
//! let config = ConnectionConfig::default();
//! let mut client = EdgeMessagingClient::new(config);
//!
//! client.register_handler("edge/commands", |payload| {
//!     println!("command: {payload}");
//! });
//!
//! if client.start().await {
//!     client.publish("edge/status", b"online").await;
//! }
//! client.stop().await;
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod events;
pub mod router;
pub mod transport;

pub use client::{ClientStatus, EdgeMessagingClient};
pub use connection::{
    ConnectTiming, ConnectionState, MessagingError, QosLevel, StopTiming, DEFAULT_SUBSCRIPTIONS,
};
pub use events::TransportEvent;
pub use router::{MessageHandler, TopicRouter};
pub use transport::{MqttTransport, Transport, TransportSink, TransportStream};
