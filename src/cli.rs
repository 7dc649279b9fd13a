use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "kube-log-scanner")]
#[command(about = "Periodically scan pod logs across Kubernetes clusters")]
pub struct Cli {
    /// Scanner config file (YAML)
    #[arg(long, env = "KLS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cluster registry file (YAML)
    #[arg(long, env = "KLS_CLUSTERS")]
    pub clusters: Option<PathBuf>,

    /// Seconds between scan passes
    #[arg(long, env = "KLS_INTERVAL")]
    pub interval: Option<u64>,

    /// Kubernetes API timeout in seconds
    #[arg(long, env = "KLS_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Pattern matched against job logs (case-insensitive regex)
    #[arg(long, env = "KLS_GREP")]
    pub grep: Option<String>,

    /// Pause between pod log requests within a namespace, in milliseconds
    #[arg(long, env = "KLS_DISPATCH_DELAY_MS")]
    pub dispatch_delay_ms: Option<u64>,

    /// Seconds to wait for the in-flight pass on shutdown
    #[arg(long, env = "KLS_SHUTDOWN_TIMEOUT")]
    pub shutdown_timeout: Option<u64>,

    /// Run a single pass, print the results and exit
    #[arg(long)]
    pub once: bool,

    /// Output format for --once
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
