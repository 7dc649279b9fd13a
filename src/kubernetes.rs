use crate::classifier::LogSink;
use crate::error::{ApiError, ClientInitError};
use crate::types::{Cluster, PodDescriptor, PodPhase};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::io::{AsyncBufRead, AsyncBufReadExt};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::config::{Config, KubeConfigOptions, Kubeconfig};
use kube::{
    Api, Client, ResourceExt,
    api::{ListParams, LogParams},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Pod-level operations against one cluster.
#[async_trait]
pub trait KubeApi: Send + Sync {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodDescriptor>, ApiError>;

    /// Read the pod's current log, handing every line to `sink`.
    ///
    /// The underlying stream is released before this returns, whatever the outcome.
    async fn read_logs(
        &self,
        pod_name: &str,
        namespace: &str,
        sink: &mut dyn LogSink,
    ) -> Result<(), ApiError>;
}

/// Builds a `KubeApi` for a cluster from its connection descriptor.
#[async_trait]
pub trait KubeConnector: Send + Sync {
    async fn connect(
        &self,
        cluster: &Cluster,
        timeout: Duration,
    ) -> Result<Arc<dyn KubeApi>, ClientInitError>;
}

/// Connector that treats the descriptor as kubeconfig YAML.
#[derive(Debug, Default, Clone)]
pub struct KubeconfigConnector;

#[async_trait]
impl KubeConnector for KubeconfigConnector {
    async fn connect(
        &self,
        cluster: &Cluster,
        timeout: Duration,
    ) -> Result<Arc<dyn KubeApi>, ClientInitError> {
        let kubeconfig = Kubeconfig::from_yaml(&cluster.connection_descriptor)?;
        let mut config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        config.connect_timeout = Some(timeout);
        config.read_timeout = Some(timeout);
        let client = Client::try_from(config)?;
        debug!("[{}] Initialized client", cluster.name);
        Ok(Arc::new(ClusterClient { client }))
    }
}

pub struct ClusterClient {
    client: Client,
}

#[async_trait]
impl KubeApi for ClusterClient {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodDescriptor>, ApiError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api.list(&ListParams::default()).await?;
        Ok(pods
            .items
            .iter()
            .map(|pod| pod_descriptor(pod, namespace))
            .collect())
    }

    async fn read_logs(
        &self,
        pod_name: &str,
        namespace: &str,
        sink: &mut dyn LogSink,
    ) -> Result<(), ApiError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let stream = api.log_stream(pod_name, &LogParams::default()).await?;
        read_lines_lossy(stream, sink).await?;
        Ok(())
    }
}

/// Feed `reader` to `sink` line by line. Bytes that are not UTF-8 are replaced
/// rather than failing the read, so one binary line cannot hide a pod.
pub async fn read_lines_lossy<R>(reader: R, sink: &mut dyn LogSink) -> std::io::Result<()>
where
    R: AsyncBufRead,
{
    let mut reader = std::pin::pin!(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        sink.push_line(&String::from_utf8_lossy(&buf));
    }
}

pub fn pod_descriptor(pod: &Pod, namespace: &str) -> PodDescriptor {
    let status = pod.status.as_ref();
    PodDescriptor {
        name: pod.name_any(),
        namespace: pod.namespace().unwrap_or_else(|| namespace.to_string()),
        phase: status
            .and_then(|s| s.phase.as_deref())
            .map(PodPhase::from)
            .unwrap_or(PodPhase::Unknown),
        created_at: pod
            .metadata
            .creation_timestamp
            .as_ref()
            .and_then(time_to_utc),
        restart_count: status
            .and_then(|s| s.container_statuses.as_ref())
            .and_then(|statuses| statuses.first())
            .map(|cs| cs.restart_count)
            .unwrap_or(0),
    }
}

// The wrapped timestamp type differs between k8s-openapi releases, the RFC 3339 wire form does not.
fn time_to_utc(time: &Time) -> Option<DateTime<Utc>> {
    serde_json::to_value(time)
        .ok()
        .and_then(|value| serde_json::from_value(value).ok())
}
