use crate::classifier::compile_grep_pattern;
use crate::cli::Cli;
use crate::scanner::ScanSettings;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scanner configuration, read from YAML. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScannerConfig {
    pub scan_interval_secs: u64,
    pub kubernetes_timeout_secs: u64,
    pub job_grep_pattern: String,
    pub pod_dispatch_delay_ms: u64,
    pub shutdown_timeout_secs: u64,
    pub clusters_file: PathBuf,
    pub log_level: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 60,
            kubernetes_timeout_secs: 10,
            job_grep_pattern: "error".to_string(),
            pod_dispatch_delay_ms: 200,
            shutdown_timeout_secs: 30,
            clusters_file: PathBuf::from("clusters.yaml"),
            log_level: "info".to_string(),
        }
    }
}

impl ScannerConfig {
    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(raw).context("Invalid scanner config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("in {}", path.display()))
    }

    /// File (if any), then command line overrides, then validation.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.clusters {
            self.clusters_file = path.clone();
        }
        if let Some(interval) = cli.interval {
            self.scan_interval_secs = interval;
        }
        if let Some(timeout) = cli.timeout {
            self.kubernetes_timeout_secs = timeout;
        }
        if let Some(pattern) = &cli.grep {
            self.job_grep_pattern = pattern.clone();
        }
        if let Some(delay) = cli.dispatch_delay_ms {
            self.pod_dispatch_delay_ms = delay;
        }
        if let Some(timeout) = cli.shutdown_timeout {
            self.shutdown_timeout_secs = timeout;
        }
        if cli.verbose {
            self.log_level = "debug".to_string();
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scan_interval_secs == 0 {
            anyhow::bail!("scan_interval_secs must be greater than zero");
        }
        if self.kubernetes_timeout_secs == 0 {
            anyhow::bail!("kubernetes_timeout_secs must be greater than zero");
        }
        compile_grep_pattern(&self.job_grep_pattern)
            .with_context(|| format!("Invalid job grep pattern '{}'", self.job_grep_pattern))?;
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn scan_settings(&self) -> anyhow::Result<ScanSettings> {
        Ok(ScanSettings {
            kubernetes_timeout: Duration::from_secs(self.kubernetes_timeout_secs),
            pod_dispatch_delay: Duration::from_millis(self.pod_dispatch_delay_ms),
            job_grep: compile_grep_pattern(&self.job_grep_pattern)?,
        })
    }
}
