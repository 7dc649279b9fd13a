use crate::classifier::{JobLogCapture, LevelHistogram};
use crate::error::{ApiError, ScanError};
use crate::kubernetes::{KubeApi, KubeConnector};
use crate::registry::ClusterRegistry;
use crate::store::ScanStore;
use crate::types::{Cluster, JobScan, PodDescriptor, PodPhase, ServiceScan};
use chrono::Utc;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Scan settings shared by every level of a pass.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub kubernetes_timeout: Duration,
    /// Pause between consecutive pod dispatches within one namespace.
    pub pod_dispatch_delay: Duration,
    pub job_grep: Regex,
}

/// Produces one scan record for one pod.
#[derive(Debug, Clone)]
pub struct PodScanner {
    job_grep: Regex,
}

pub enum PodScan {
    Service(ServiceScan),
    Job(JobScan),
}

impl PodScanner {
    pub fn new(job_grep: Regex) -> Self {
        Self { job_grep }
    }

    pub async fn scan_service(
        &self,
        api: &dyn KubeApi,
        pod: &PodDescriptor,
    ) -> Result<ServiceScan, ApiError> {
        let mut histogram = LevelHistogram::new(&pod.name);
        api.read_logs(&pod.name, &pod.namespace, &mut histogram)
            .await?;
        let finished_at = Utc::now();
        Ok(ServiceScan {
            service_name: pod.name.clone(),
            uptime: pod.age_at(finished_at),
            restarts_count: pod.restart_count,
            level_counts: histogram.counts,
            non_classifiable_line_count: histogram.non_classifiable,
            total_lines: histogram.total,
            finished_at,
        })
    }

    pub async fn scan_job(
        &self,
        api: &dyn KubeApi,
        pod: &PodDescriptor,
    ) -> Result<JobScan, ApiError> {
        let mut capture = JobLogCapture::new(self.job_grep.clone());
        api.read_logs(&pod.name, &pod.namespace, &mut capture)
            .await?;
        let finished_at = Utc::now();
        Ok(JobScan {
            job_name: pod.name.clone(),
            age: pod.age_at(finished_at),
            full_log: capture.full_log,
            grep_pattern: self.job_grep.as_str().to_string(),
            matched_lines: capture.matched_lines,
            finished_at,
        })
    }

    /// Scan a pod according to its phase. `None` for phases that are not scanned.
    pub async fn scan(
        &self,
        api: &dyn KubeApi,
        pod: &PodDescriptor,
    ) -> Option<Result<PodScan, ApiError>> {
        match pod.phase {
            PodPhase::Running => Some(self.scan_service(api, pod).await.map(PodScan::Service)),
            PodPhase::Succeeded | PodPhase::Failed => {
                Some(self.scan_job(api, pod).await.map(PodScan::Job))
            }
            PodPhase::Pending | PodPhase::Unknown => None,
        }
    }
}

/// What happened to one cluster during a pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClusterOutcome {
    pub client_failed: bool,
    pub namespaces_stored: usize,
    pub namespaces_failed: usize,
    pub namespaces_skipped: usize,
}

/// Totals for one full pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub clusters_scanned: usize,
    pub clusters_failed: usize,
    pub namespaces_stored: usize,
    pub namespaces_failed: usize,
    pub namespaces_skipped: usize,
}

impl PassSummary {
    fn add(&mut self, outcome: &ClusterOutcome) {
        if outcome.client_failed {
            self.clusters_failed += 1;
        } else {
            self.clusters_scanned += 1;
        }
        self.namespaces_stored += outcome.namespaces_stored;
        self.namespaces_failed += outcome.namespaces_failed;
        self.namespaces_skipped += outcome.namespaces_skipped;
    }
}

/// Runs full passes: registry, then clusters, namespaces and pods in parallel.
pub struct ScanEngine {
    registry: Arc<dyn ClusterRegistry>,
    connector: Arc<dyn KubeConnector>,
    store: Arc<dyn ScanStore>,
    pod_scanner: PodScanner,
    settings: ScanSettings,
}

impl ScanEngine {
    pub fn new(
        registry: Arc<dyn ClusterRegistry>,
        connector: Arc<dyn KubeConnector>,
        store: Arc<dyn ScanStore>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            registry,
            connector,
            store,
            pod_scanner: PodScanner::new(settings.job_grep.clone()),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn ScanStore> {
        &self.store
    }

    /// One full pass. Returns once every cluster scan of the pass has finished.
    ///
    /// Returns `None` when the registry could not be read.
    pub async fn scan_all(self: &Arc<Self>, stop: &watch::Receiver<bool>) -> Option<PassSummary> {
        let clusters = match self.registry.get_all_clusters().await {
            Ok(clusters) => clusters,
            Err(e) => {
                error!("Failed to get clusters from registry: {}", e);
                return None;
            }
        };

        let mut tasks = JoinSet::new();
        for cluster in clusters {
            let engine = Arc::clone(self);
            let stop = stop.clone();
            tasks.spawn(async move { engine.scan_cluster(cluster, stop).await });
        }

        let mut summary = PassSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.add(&outcome),
                Err(e) => {
                    error!("Cluster scan task failed: {}", e);
                    summary.clusters_failed += 1;
                }
            }
        }
        Some(summary)
    }

    pub async fn scan_cluster(
        self: Arc<Self>,
        cluster: Cluster,
        stop: watch::Receiver<bool>,
    ) -> ClusterOutcome {
        let mut outcome = ClusterOutcome::default();
        let api = match self
            .connector
            .connect(&cluster, self.settings.kubernetes_timeout)
            .await
        {
            Ok(api) => api,
            Err(e) => {
                error!("[{}] Failed to initialize client: {}", cluster.name, e);
                outcome.client_failed = true;
                return outcome;
            }
        };

        let mut tasks = JoinSet::new();
        for namespace in &cluster.namespaces {
            if is_stopping(&stop) {
                warn!(
                    "[{}] Scanner stopping, not scanning namespace {}",
                    cluster.name, namespace
                );
                outcome.namespaces_skipped += 1;
                continue;
            }
            let engine = Arc::clone(&self);
            let api = Arc::clone(&api);
            let cluster_name = cluster.name.clone();
            let namespace = namespace.clone();
            let stop = stop.clone();
            tasks.spawn(async move {
                let result = engine
                    .scan_namespace(api, &cluster_name, &namespace, &stop)
                    .await;
                (cluster_name, namespace, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, _, Ok(()))) => outcome.namespaces_stored += 1,
                Ok((cluster_name, namespace, Err(ScanError::ScannerStopped))) => {
                    warn!(
                        "[{}] Scanner stopping, namespace {} not scanned",
                        cluster_name, namespace
                    );
                    outcome.namespaces_skipped += 1;
                }
                Ok((cluster_name, namespace, Err(e))) => {
                    error!(
                        "[{}] Failed to scan namespace {}: {}",
                        cluster_name, namespace, e
                    );
                    outcome.namespaces_failed += 1;
                }
                Err(e) => {
                    error!("[{}] Namespace scan task failed: {}", cluster.name, e);
                    outcome.namespaces_failed += 1;
                }
            }
        }

        info!(
            "[{}] Cluster scan finished: {} stored, {} failed, {} skipped",
            cluster.name,
            outcome.namespaces_stored,
            outcome.namespaces_failed,
            outcome.namespaces_skipped
        );
        outcome
    }

    /// Scan every pod of one namespace and replace its stored entry.
    ///
    /// Pods whose logs cannot be read are left out of the result.
    pub async fn scan_namespace(
        self: Arc<Self>,
        api: Arc<dyn KubeApi>,
        cluster: &str,
        namespace: &str,
        stop: &watch::Receiver<bool>,
    ) -> Result<(), ScanError> {
        if is_stopping(stop) {
            return Err(ScanError::ScannerStopped);
        }

        let pods = api.list_pods(namespace).await.map_err(ScanError::ListPods)?;
        debug!(
            "[{}] Found {} pod(s) in namespace {}",
            cluster,
            pods.len(),
            namespace
        );

        let mut tasks = JoinSet::new();
        let mut dispatched = 0usize;
        for pod in pods {
            if matches!(pod.phase, PodPhase::Pending | PodPhase::Unknown) {
                debug!(
                    "[{}] Skipping pod {}/{} in phase {:?}",
                    cluster, namespace, pod.name, pod.phase
                );
                continue;
            }
            if dispatched > 0 && !self.settings.pod_dispatch_delay.is_zero() {
                tokio::time::sleep(self.settings.pod_dispatch_delay).await;
            }
            let index = dispatched;
            dispatched += 1;

            let scanner = self.pod_scanner.clone();
            let api = Arc::clone(&api);
            tasks.spawn(async move {
                let result = scanner.scan(api.as_ref(), &pod).await;
                (index, pod.name, result)
            });
        }

        let mut scans = Vec::with_capacity(dispatched);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Some(Ok(scan)))) => scans.push((index, scan)),
                Ok((_, _, None)) => {}
                Ok((_, pod_name, Some(Err(e)))) => {
                    warn!(
                        "[{}] Failed to read logs of pod {}/{}: {}",
                        cluster, namespace, pod_name, e
                    );
                }
                Err(e) => {
                    error!(
                        "[{}] Pod scan task in namespace {} failed: {}",
                        cluster, namespace, e
                    );
                }
            }
        }
        scans.sort_by_key(|(index, _)| *index);

        let mut services = Vec::new();
        let mut jobs = Vec::new();
        for (_, scan) in scans {
            match scan {
                PodScan::Service(scan) => services.push(scan),
                PodScan::Job(scan) => jobs.push(scan),
            }
        }
        self.store.replace(cluster, namespace, services, jobs)?;
        Ok(())
    }
}

fn is_stopping(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow()
}
