use crate::error::StoreError;
use crate::types::{JobScan, ScanKey, ScanResults, ServiceScan};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Latest scan results per `(cluster, namespace)`.
pub trait ScanStore: Send + Sync {
    /// Current entry, or empty lists when the key was never written.
    fn get(&self, cluster: &str, namespace: &str) -> Arc<ScanResults>;

    /// Overwrite the entry for the key with both lists at once.
    fn replace(
        &self,
        cluster: &str,
        namespace: &str,
        services: Vec<ServiceScan>,
        jobs: Vec<JobScan>,
    ) -> Result<(), StoreError>;

    fn clear(&self, cluster: &str, namespace: &str);

    /// Keys that currently hold an entry, sorted.
    fn keys(&self) -> Vec<ScanKey>;
}

/// In-memory store. Readers share the lock; a replace holds it exclusively.
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: RwLock<HashMap<ScanKey, Arc<ScanResults>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScanStore for ResultStore {
    fn get(&self, cluster: &str, namespace: &str) -> Arc<ScanResults> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&ScanKey::new(cluster, namespace))
            .cloned()
            .unwrap_or_default()
    }

    fn replace(
        &self,
        cluster: &str,
        namespace: &str,
        services: Vec<ServiceScan>,
        jobs: Vec<JobScan>,
    ) -> Result<(), StoreError> {
        let key = ScanKey::new(cluster, namespace);
        let results = Arc::new(ScanResults { services, jobs });
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Poisoned(key.to_string()))?;
        debug!(
            "[{}] Storing {} service scan(s) and {} job scan(s) for namespace {}",
            key.cluster,
            results.services.len(),
            results.jobs.len(),
            key.namespace
        );
        entries.insert(key, results);
        Ok(())
    }

    fn clear(&self, cluster: &str, namespace: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(&ScanKey::new(cluster, namespace)).is_some() {
            debug!("[{}] Cleared scans for namespace {}", cluster, namespace);
        }
    }

    fn keys(&self) -> Vec<ScanKey> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<ScanKey> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}
