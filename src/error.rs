use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The cluster registry could not be enumerated; the whole pass is skipped.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read cluster registry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse cluster registry {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to read kubeconfig {path} for cluster '{cluster}': {source}")]
    Kubeconfig {
        cluster: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cluster registry entry: {0}")]
    Invalid(String),
}

/// No API client could be built for one cluster.
#[derive(Debug, Error)]
pub enum ClientInitError {
    #[error("Invalid kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("Failed to create client: {0}")]
    Client(#[from] kube::Error),
}

/// A list-pods or log-stream call failed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error("Log stream read failed: {0}")]
    Stream(#[from] std::io::Error),
}

/// The result store rejected a replace.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Result store lock poisoned while writing {0}")]
    Poisoned(String),
}

/// Why a namespace scan produced no stored result.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to list pods: {0}")]
    ListPods(#[source] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Scanner is stopping")]
    ScannerStopped,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scanner is already running")]
    AlreadyRunning,

    #[error("Scanner is not running")]
    NotRunning,

    #[error("Scanner did not stop within {0:?}, in-flight pass left running")]
    ForcedStop(Duration),

    #[error("Scanner loop terminated abnormally: {0}")]
    LoopFailed(String),
}
