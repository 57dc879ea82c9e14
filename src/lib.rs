//! Edge deployment coordinator
//!
//! Coordinates edge-site automation by combining container deployment,
//! cluster-orchestration deployment, and an MQTT publish/subscribe channel
//! used to broadcast deployment events and receive remote commands.
//!
//! The heart of the crate is [`messaging::EdgeMessagingClient`]: a
//! persistent-connection client that maintains a link to the broker, routes
//! inbound messages to registered handlers by topic, and exposes a
//! thread-safe publish operation. The container runtime and cluster
//! orchestrator are external managers consumed through the traits in
//! [`deploy`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use edge_deploy::config::ConnectionConfig;
//! use edge_deploy::messaging::EdgeMessagingClient;
//!
//! # tokio_test::block_on(async {
//! let mut client = EdgeMessagingClient::new(ConnectionConfig::default());
//!
//! client.register_handler("edge/commands", |payload| {
//!     println!("remote command: {payload}");
//! });
//!
//! if client.start().await {
//!     client.publish("edge/status", b"online").await;
//!     client.stop().await;
//! }
//! # });
//! ```

pub mod config;
pub mod deploy;
pub mod error;
pub mod messaging;
pub mod observability;
pub mod testing;

pub use config::{ConnectionConfig, EdgeConfig};
pub use deploy::{
    AppSpec, ClusterOrchestrator, ContainerRuntime, DeploymentEvent, DeploymentOutcome,
    EdgeDeploymentManager,
};
pub use error::{EdgeError, EdgeResult};
pub use messaging::{ConnectionState, EdgeMessagingClient, QosLevel, TopicRouter};
