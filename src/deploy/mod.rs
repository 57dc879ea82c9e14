//! Deployment collaborators and wire types
//!
//! The container runtime and cluster orchestrator are external managers; this
//! module defines only the interface the coordinator calls them through, the
//! deployment request types, and the concrete JSON schema for deployment
//! events published over the messaging core.

pub mod manager;

pub use manager::EdgeDeploymentManager;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Errors from deployment collaborators
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Container runtime error: {0}")]
    ContainerRuntime(String),
    #[error("Cluster orchestrator error: {0}")]
    ClusterOrchestrator(String),
    #[error("Invalid deployment spec: {0}")]
    InvalidSpec(String),
}

/// Container deployment request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerSpec {
    pub image: String,
    pub name: String,
    /// Container port to host port
    #[serde(default)]
    pub ports: HashMap<String, u16>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default = "default_restart_policy")]
    pub restart_policy: String,
}

fn default_restart_policy() -> String {
    "unless-stopped".to_string()
}

/// Status record for a running container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub id: String,
    pub name: String,
    pub status: String,
    pub image: String,
}

/// Status record for a cluster workload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadStatus {
    pub name: String,
    pub namespace: String,
    pub ready_replicas: u32,
    pub desired_replicas: u32,
}

/// Deployment request, tagged by target platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AppSpec {
    Docker(ContainerSpec),
    Kubernetes {
        name: String,
        manifest: String,
        #[serde(default)]
        namespace: Option<String>,
    },
}

impl AppSpec {
    /// Application name used in logs and deployment events
    pub fn name(&self) -> &str {
        match self {
            AppSpec::Docker(spec) => &spec.name,
            AppSpec::Kubernetes { name, .. } => name,
        }
    }
}

/// Outcome of a deployment attempt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentOutcome {
    Success,
    Failed,
}

/// Deployment event published on `edge/deployments`.
///
/// A fixed-field record with a stable JSON encoding; consumers can rely on
/// round-tripping through serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentEvent {
    pub event_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: DeploymentOutcome,
    pub application: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DeploymentEvent {
    /// Event for a container deployment attempt
    pub fn container(application: &str, status: DeploymentOutcome, container_id: Option<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind: "deployment".to_string(),
            status,
            application: application.to_string(),
            container_id,
            platform: Some("docker".to_string()),
            namespace: None,
            timestamp: Utc::now(),
        }
    }

    /// Event for a cluster deployment attempt
    pub fn cluster(application: &str, status: DeploymentOutcome, namespace: &str) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind: "deployment".to_string(),
            status,
            application: application.to_string(),
            container_id: None,
            platform: Some("kubernetes".to_string()),
            namespace: Some(namespace.to_string()),
            timestamp: Utc::now(),
        }
    }
}

/// Container runtime collaborator (external manager, consumed as-is)
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Deploy a container, returning its identifier
    async fn deploy(&self, spec: &ContainerSpec) -> Result<String, DeployError>;

    /// Stop a running container
    async fn stop(&self, container_id: &str) -> Result<(), DeployError>;

    /// List known containers
    async fn list_containers(&self) -> Result<Vec<ContainerStatus>, DeployError>;

    /// True iff the runtime is reachable
    async fn health_check(&self) -> bool;
}

/// Cluster orchestrator collaborator (external manager, consumed as-is)
#[async_trait]
pub trait ClusterOrchestrator: Send + Sync {
    /// Apply a deployment manifest in a namespace
    async fn deploy_manifest(&self, manifest: &str, namespace: &str) -> Result<(), DeployError>;

    /// Delete a named deployment from a namespace
    async fn delete(&self, name: &str, namespace: &str) -> Result<(), DeployError>;

    /// List workloads in a namespace
    async fn list_deployments(&self, namespace: &str) -> Result<Vec<WorkloadStatus>, DeployError>;

    /// True iff the cluster is reachable
    async fn health_check(&self) -> bool;
}
