use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kube-hygiene")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Report misconfigured and mis-sized Kubernetes workloads")]
#[command(long_about = "A read-only analyzer that inspects deployments, pods and their live metrics and reports potential misconfigurations and inefficiencies, graded by severity.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sanitize deployments and pods and report their issues
    Scan {
        /// Read cluster state from a snapshot file (YAML or JSON)
        #[arg(short, long, value_name = "FILE", conflicts_with = "live")]
        snapshot: Option<PathBuf>,

        /// Read cluster state from the current kubeconfig cluster (the default
        /// without --snapshot; required by --context and --namespace)
        #[arg(long)]
        live: bool,

        /// Kubeconfig context to use with --live
        #[arg(long, requires = "live")]
        context: Option<String>,

        /// Only scan this namespace with --live
        #[arg(short, long, requires = "live")]
        namespace: Option<String>,

        /// Compare requests against current usage (needs pod metrics)
        #[arg(long)]
        over_allocs: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Hide issues below this level
        #[arg(long, value_enum, default_value = "ok")]
        min_level: LevelThreshold,
    },

    /// Dump the live cluster state to a snapshot file
    Snapshot {
        /// Kubeconfig context to use
        #[arg(long)]
        context: Option<String>,

        /// Only dump this namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelThreshold {
    Ok,
    Info,
    Warn,
    Error,
}

impl From<LevelThreshold> for crate::issues::Severity {
    fn from(level: LevelThreshold) -> Self {
        match level {
            LevelThreshold::Ok => Self::Ok,
            LevelThreshold::Info => Self::Info,
            LevelThreshold::Warn => Self::Warn,
            LevelThreshold::Error => Self::Error,
        }
    }
}

impl Cli {
    /// Log level for the `-v` count, `None` under `--quiet`.
    pub fn log_level(&self) -> Option<log::LevelFilter> {
        if self.quiet {
            return None;
        }

        Some(match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
    }

    /// Initialize `env_logger`; `RUST_LOG` still applies per module.
    pub fn init_logging(&self) {
        if let Some(level) = self.log_level() {
            env_logger::Builder::new()
                .filter_level(level)
                .parse_default_env()
                .init();
        }
    }
}
