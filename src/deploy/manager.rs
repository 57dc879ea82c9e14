//! Deployment manager facade
//!
//! Composes the messaging client with the container runtime and cluster
//! orchestrator collaborators. Deployment attempts publish a
//! `DeploymentEvent` on `edge/deployments` best effort: a publish failure is
//! logged but never fails the deployment itself.

use super::{
    AppSpec, ClusterOrchestrator, ContainerRuntime, DeploymentEvent, DeploymentOutcome,
};
use crate::messaging::EdgeMessagingClient;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Orchestrates edge deployments and broadcasts their outcomes
pub struct EdgeDeploymentManager {
    messaging: EdgeMessagingClient,
    containers: Arc<dyn ContainerRuntime>,
    cluster: Arc<dyn ClusterOrchestrator>,
    default_namespace: String,
}

impl EdgeDeploymentManager {
    pub fn new(
        messaging: EdgeMessagingClient,
        containers: Arc<dyn ContainerRuntime>,
        cluster: Arc<dyn ClusterOrchestrator>,
        default_namespace: String,
    ) -> Self {
        Self {
            messaging,
            containers,
            cluster,
            default_namespace,
        }
    }

    /// Start the messaging channel. Returns `false` if the broker could not
    /// be reached within the bounded wait; deployments still work without it,
    /// only event broadcasting is lost.
    pub async fn start(&mut self) -> bool {
        info!("Starting edge deployment manager...");
        let started = self.messaging.start().await;
        if started {
            info!("Edge deployment manager started");
        } else {
            warn!("Messaging channel unavailable; deployment events will not be broadcast");
        }
        started
    }

    /// Stop the messaging channel
    pub async fn stop(&mut self) {
        info!("Stopping edge deployment manager...");
        self.messaging.stop().await;
        info!("Edge deployment manager stopped");
    }

    /// Deploy an application and broadcast the outcome.
    ///
    /// Dispatches to the collaborator matching the request's platform tag and
    /// publishes a deployment event either way. Returns `true` iff the
    /// deployment itself succeeded.
    pub async fn deploy_application(&self, spec: &AppSpec) -> bool {
        info!("Deploying application: {}", spec.name());

        let (succeeded, event) = match spec {
            AppSpec::Docker(container) => match self.containers.deploy(container).await {
                Ok(container_id) => {
                    info!("Container deployed: {}", container_id);
                    (
                        true,
                        DeploymentEvent::container(
                            &container.name,
                            DeploymentOutcome::Success,
                            Some(container_id),
                        ),
                    )
                }
                Err(e) => {
                    error!("Failed to deploy container {}: {}", container.name, e);
                    (
                        false,
                        DeploymentEvent::container(&container.name, DeploymentOutcome::Failed, None),
                    )
                }
            },
            AppSpec::Kubernetes {
                name,
                manifest,
                namespace,
            } => {
                let namespace = namespace.as_deref().unwrap_or(&self.default_namespace);
                match self.cluster.deploy_manifest(manifest, namespace).await {
                    Ok(()) => {
                        info!("Cluster deployment applied: {} in {}", name, namespace);
                        (
                            true,
                            DeploymentEvent::cluster(name, DeploymentOutcome::Success, namespace),
                        )
                    }
                    Err(e) => {
                        error!("Failed to deploy {} to cluster: {}", name, e);
                        (
                            false,
                            DeploymentEvent::cluster(name, DeploymentOutcome::Failed, namespace),
                        )
                    }
                }
            }
        };

        self.publish_event(&event).await;
        succeeded
    }

    /// Broadcast a deployment event on `edge/deployments`, best effort
    async fn publish_event(&self, event: &DeploymentEvent) {
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode deployment event: {}", e);
                return;
            }
        };

        if !self.messaging.publish("edge/deployments", &payload).await {
            warn!(
                "Deployment event for {} not broadcast (messaging unavailable)",
                event.application
            );
        }
    }

    /// Access the messaging client (handler registration, status)
    pub fn messaging(&self) -> &EdgeMessagingClient {
        &self.messaging
    }
}
