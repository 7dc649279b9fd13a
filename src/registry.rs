use crate::error::RegistryError;
use crate::types::Cluster;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of the clusters to scan. Read once per pass.
#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    async fn get_all_clusters(&self) -> Result<Vec<Cluster>, RegistryError>;
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    clusters: Vec<ClusterEntry>,
}

#[derive(Debug, Deserialize)]
struct ClusterEntry {
    name: String,
    #[serde(default)]
    namespaces: Vec<String>,
    kubeconfig: Option<String>,
    kubeconfig_path: Option<PathBuf>,
}

/// Registry backed by a YAML file, re-read on every pass so edits apply on the next tick.
///
/// ```yaml
/// clusters:
///   - name: prod
///     kubeconfig_path: /etc/scanner/prod.kubeconfig
///     namespaces: [default, batch]
/// ```
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ClusterRegistry for FileRegistry {
    async fn get_all_clusters(&self) -> Result<Vec<Cluster>, RegistryError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RegistryError::Read {
                path: self.path.clone(),
                source,
            })?;
        let base_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut clusters = Vec::new();
        for entry in parse_registry(&raw, &self.path)? {
            let connection_descriptor = match (entry.kubeconfig, entry.kubeconfig_path) {
                (Some(inline), None) => inline,
                (None, Some(path)) => {
                    let path = if path.is_relative() {
                        base_dir.join(path)
                    } else {
                        path
                    };
                    tokio::fs::read_to_string(&path).await.map_err(|source| {
                        RegistryError::Kubeconfig {
                            cluster: entry.name.clone(),
                            path,
                            source,
                        }
                    })?
                }
                _ => {
                    return Err(RegistryError::Invalid(format!(
                        "cluster '{}' must set exactly one of kubeconfig or kubeconfig_path",
                        entry.name
                    )));
                }
            };
            clusters.push(Cluster {
                name: entry.name,
                connection_descriptor,
                namespaces: entry.namespaces,
            });
        }
        debug!(
            "Loaded {} cluster(s) from {}",
            clusters.len(),
            self.path.display()
        );
        Ok(clusters)
    }
}

fn parse_registry(raw: &str, path: &Path) -> Result<Vec<ClusterEntry>, RegistryError> {
    let file: RegistryFile = serde_yaml::from_str(raw).map_err(|source| RegistryError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut seen = HashSet::new();
    for entry in &file.clusters {
        if entry.name.trim().is_empty() {
            return Err(RegistryError::Invalid("cluster name is empty".to_string()));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(RegistryError::Invalid(format!(
                "duplicate cluster name '{}'",
                entry.name
            )));
        }
    }
    Ok(file.clusters)
}
