use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A registered cluster as handed out by the registry for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub name: String,
    /// Kubeconfig YAML, opaque to everything except the connector.
    pub connection_descriptor: String,
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(value: &str) -> Self {
        match value {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

/// The subset of a pod the scanner looks at.
#[derive(Debug, Clone)]
pub struct PodDescriptor {
    pub name: String,
    pub namespace: String,
    pub phase: PodPhase,
    pub created_at: Option<DateTime<Utc>>,
    /// Restart count of the first container, 0 when no statuses are reported.
    pub restart_count: i32,
}

impl PodDescriptor {
    /// Time elapsed since the pod was created, never negative.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        self.created_at
            .and_then(|created| now.signed_duration_since(created).to_std().ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanKey {
    pub cluster: String,
    pub namespace: String,
}

impl ScanKey {
    pub fn new(cluster: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster, self.namespace)
    }
}

/// One scan of one running pod.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceScan {
    pub service_name: String,
    pub uptime: Duration,
    pub restarts_count: i32,
    pub level_counts: BTreeMap<LogLevel, u64>,
    pub non_classifiable_line_count: u64,
    pub total_lines: u64,
    pub finished_at: DateTime<Utc>,
}

/// One scan of one terminated pod.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobScan {
    pub job_name: String,
    pub age: Duration,
    pub full_log: String,
    pub grep_pattern: String,
    pub matched_lines: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

/// The latest results stored for one `ScanKey`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResults {
    pub services: Vec<ServiceScan>,
    pub jobs: Vec<JobScan>,
}

impl ScanResults {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.jobs.is_empty()
    }
}
