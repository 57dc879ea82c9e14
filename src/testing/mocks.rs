//! Mock implementations for testing
//!
//! Provides a scripted transport that simulates a broker (inbound events are
//! injected by the test, outbound calls are recorded) plus mock container
//! runtime and cluster orchestrator collaborators.

use crate::deploy::{
    ClusterOrchestrator, ContainerRuntime, ContainerSpec, ContainerStatus, DeployError,
    WorkloadStatus,
};
use crate::messaging::{
    MessagingError, QosLevel, Transport, TransportEvent, TransportSink, TransportStream,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};

/// Recorded outbound publish: (topic, payload, qos level, retain)
pub type PublishRecord = (String, Vec<u8>, u8, bool);

/// Scripted broker transport.
///
/// Each `open()` produces a fresh sink/stream pair. Inbound events flow from
/// `inject*` calls to the stream; outbound publish/subscribe/disconnect calls
/// are recorded for assertions.
pub struct ScriptedTransport {
    current_tx: StdMutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    auto_connack: bool,
    fail_publish: bool,
    published: Arc<Mutex<Vec<PublishRecord>>>,
    subscribed: Arc<Mutex<Vec<(String, u8)>>>,
    disconnects: Arc<Mutex<u32>>,
}

impl ScriptedTransport {
    /// Broker that acknowledges the connection immediately on open
    pub fn acknowledging() -> Arc<Self> {
        Arc::new(Self {
            current_tx: StdMutex::new(None),
            auto_connack: true,
            fail_publish: false,
            published: Arc::new(Mutex::new(Vec::new())),
            subscribed: Arc::new(Mutex::new(Vec::new())),
            disconnects: Arc::new(Mutex::new(0)),
        })
    }

    /// Broker that never acknowledges the connection
    pub fn silent() -> Arc<Self> {
        Arc::new(Self {
            current_tx: StdMutex::new(None),
            auto_connack: false,
            fail_publish: false,
            published: Arc::new(Mutex::new(Vec::new())),
            subscribed: Arc::new(Mutex::new(Vec::new())),
            disconnects: Arc::new(Mutex::new(0)),
        })
    }

    /// Broker that acknowledges but rejects every publish
    pub fn with_failing_publishes() -> Arc<Self> {
        Arc::new(Self {
            current_tx: StdMutex::new(None),
            auto_connack: true,
            fail_publish: true,
            published: Arc::new(Mutex::new(Vec::new())),
            subscribed: Arc::new(Mutex::new(Vec::new())),
            disconnects: Arc::new(Mutex::new(0)),
        })
    }

    /// Inject a transport event into the currently open stream
    pub fn inject(&self, event: TransportEvent) {
        let guard = self.current_tx.lock().expect("scripted transport lock");
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Inject a broker acknowledgment
    pub fn inject_connack(&self) {
        self.inject(TransportEvent::ConnAck);
    }

    /// Inject an inbound message
    pub fn inject_message(&self, topic: &str, payload: &[u8]) {
        self.inject(TransportEvent::Message {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            retain: false,
        });
    }

    /// Inject an unexpected broker-side disconnect
    pub fn inject_disconnect(&self) {
        self.inject(TransportEvent::Disconnected);
    }

    /// Outbound publishes recorded so far
    pub async fn published(&self) -> Vec<PublishRecord> {
        self.published.lock().await.clone()
    }

    /// Subscriptions recorded so far, in request order
    pub async fn subscriptions(&self) -> Vec<(String, u8)> {
        self.subscribed.lock().await.clone()
    }

    /// Number of disconnect requests observed
    pub async fn disconnect_count(&self) -> u32 {
        *self.disconnects.lock().await
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(
        &self,
    ) -> Result<(Arc<dyn TransportSink>, Box<dyn TransportStream>), MessagingError> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.auto_connack {
            let _ = tx.send(TransportEvent::ConnAck);
        }
        *self.current_tx.lock().expect("scripted transport lock") = Some(tx);

        Ok((
            Arc::new(ScriptedSink {
                fail_publish: self.fail_publish,
                published: self.published.clone(),
                subscribed: self.subscribed.clone(),
                disconnects: self.disconnects.clone(),
            }),
            Box::new(ScriptedStream { rx }),
        ))
    }
}

struct ScriptedSink {
    fail_publish: bool,
    published: Arc<Mutex<Vec<PublishRecord>>>,
    subscribed: Arc<Mutex<Vec<(String, u8)>>>,
    disconnects: Arc<Mutex<u32>>,
}

#[async_trait]
impl TransportSink for ScriptedSink {
    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QosLevel,
        retain: bool,
    ) -> Result<(), MessagingError> {
        if self.fail_publish {
            return Err(MessagingError::PublishFailed(
                "scripted publish rejection".to_string().into(),
            ));
        }
        self.published
            .lock()
            .await
            .push((topic.to_string(), payload.to_vec(), qos.as_u8(), retain));
        Ok(())
    }

    async fn subscribe(&self, topic: &str, qos: QosLevel) -> Result<(), MessagingError> {
        self.subscribed
            .lock()
            .await
            .push((topic.to_string(), qos.as_u8()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), MessagingError> {
        *self.disconnects.lock().await += 1;
        Ok(())
    }
}

struct ScriptedStream {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl TransportStream for ScriptedStream {
    async fn next_event(&mut self) -> Result<TransportEvent, MessagingError> {
        match self.rx.recv().await {
            Some(event) => Ok(event),
            None => Err(MessagingError::StreamEnded(
                "scripted event source closed".to_string(),
            )),
        }
    }
}

/// Mock container runtime recording deploy/stop calls
#[derive(Default)]
pub struct MockContainerRuntime {
    pub deployed: Arc<Mutex<Vec<ContainerSpec>>>,
    pub stopped: Arc<Mutex<Vec<String>>>,
    pub should_fail: bool,
}

impl MockContainerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub async fn deployed_specs(&self) -> Vec<ContainerSpec> {
        self.deployed.lock().await.clone()
    }
}

#[async_trait]
impl ContainerRuntime for MockContainerRuntime {
    async fn deploy(&self, spec: &ContainerSpec) -> Result<String, DeployError> {
        if self.should_fail {
            return Err(DeployError::ContainerRuntime(
                "mock deploy failure".to_string(),
            ));
        }
        let mut deployed = self.deployed.lock().await;
        deployed.push(spec.clone());
        Ok(format!("container-{}", deployed.len()))
    }

    async fn stop(&self, container_id: &str) -> Result<(), DeployError> {
        if self.should_fail {
            return Err(DeployError::ContainerRuntime(
                "mock stop failure".to_string(),
            ));
        }
        self.stopped.lock().await.push(container_id.to_string());
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerStatus>, DeployError> {
        let deployed = self.deployed.lock().await;
        Ok(deployed
            .iter()
            .enumerate()
            .map(|(i, spec)| ContainerStatus {
                id: format!("container-{}", i + 1),
                name: spec.name.clone(),
                status: "running".to_string(),
                image: spec.image.clone(),
            })
            .collect())
    }

    async fn health_check(&self) -> bool {
        !self.should_fail
    }
}

/// Mock cluster orchestrator recording applied manifests
#[derive(Default)]
pub struct MockClusterOrchestrator {
    pub applied: Arc<Mutex<Vec<(String, String)>>>,
    pub deleted: Arc<Mutex<Vec<(String, String)>>>,
    pub should_fail: bool,
}

impl MockClusterOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub async fn applied_manifests(&self) -> Vec<(String, String)> {
        self.applied.lock().await.clone()
    }
}

#[async_trait]
impl ClusterOrchestrator for MockClusterOrchestrator {
    async fn deploy_manifest(&self, manifest: &str, namespace: &str) -> Result<(), DeployError> {
        if self.should_fail {
            return Err(DeployError::ClusterOrchestrator(
                "mock apply failure".to_string(),
            ));
        }
        self.applied
            .lock()
            .await
            .push((manifest.to_string(), namespace.to_string()));
        Ok(())
    }

    async fn delete(&self, name: &str, namespace: &str) -> Result<(), DeployError> {
        if self.should_fail {
            return Err(DeployError::ClusterOrchestrator(
                "mock delete failure".to_string(),
            ));
        }
        self.deleted
            .lock()
            .await
            .push((name.to_string(), namespace.to_string()));
        Ok(())
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<WorkloadStatus>, DeployError> {
        let applied = self.applied.lock().await;
        Ok(applied
            .iter()
            .filter(|(_, ns)| ns == namespace)
            .enumerate()
            .map(|(i, (_, ns))| WorkloadStatus {
                name: format!("workload-{}", i + 1),
                namespace: ns.clone(),
                ready_replicas: 1,
                desired_replicas: 1,
            })
            .collect())
    }

    async fn health_check(&self) -> bool {
        !self.should_fail
    }
}
