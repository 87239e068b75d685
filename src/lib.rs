//! # kube-hygiene
//!
//! A read-only analyzer for Kubernetes clusters. It inspects deployments,
//! pods and live pod metrics and reports potential misconfigurations and
//! inefficiencies as issues graded by severity.
//!
//! ## Features
//!
//! - **Deployment sanitizer**: zero scale, availability, ReplicaSet collisions
//! - **Pod sanitizer**: phase, container readiness and restarts, limit thresholds
//! - **Container checks**: image tags, missing requests and limits, unnamed ports
//! - **Utilization**: requests compared with current usage, opt in
//!
//! ## Example
//!
//! ```rust,no_run
//! use kube_hygiene::{ClusterCache, Config, Snapshot, handlers::sanitize_cluster};
//! use kube_hygiene::sanitize::SanitizeOptions;
//! use std::path::Path;
//!
//! # fn main() -> kube_hygiene::Result<()> {
//! let snapshot = Snapshot::from_path(Path::new("cluster.yaml"))?;
//! let cache = ClusterCache::from_snapshot(snapshot, Config::default())?;
//! let sections = sanitize_cluster(&cache, &SanitizeOptions::default().with_over_allocs())?;
//! println!("{}", kube_hygiene::report::render_text(&sections));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod issues;
pub mod metrics;
pub mod quantity;
pub mod report;
pub mod sanitize;

pub use cache::{ClusterCache, Snapshot};
pub use config::Config;
pub use error::{HygieneError, Result};
pub use issues::{Collector, Issue, Outcome, Sections, Severity};

use cli::Commands;

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code when the scan found error level issues.
pub const EXIT_ISSUES: i32 = 2;

/// Run a parsed command, returning the process exit code.
pub fn run_command(config: Config, command: Commands) -> Result<i32> {
    match command {
        Commands::Scan {
            snapshot,
            live,
            context,
            namespace,
            over_allocs,
            format,
            min_level,
        } => {
            // clap keeps --snapshot and --live exclusive; without either the
            // live cluster is read.
            let source = match snapshot {
                Some(path) => handlers::Source::Snapshot(path),
                None => {
                    if !live {
                        log::debug!("No --snapshot given, reading the live cluster");
                    }
                    handlers::Source::Live { context, namespace }
                }
            };
            let report = handlers::handle_scan(
                config,
                handlers::ScanOptions {
                    source,
                    over_allocs,
                    format,
                    min_level: min_level.into(),
                },
            )?;

            print!("{}", report.rendered);
            Ok(if report.has_errors() { EXIT_ISSUES } else { 0 })
        }
        Commands::Snapshot {
            context,
            namespace,
            output,
        } => {
            handlers::handle_snapshot(context, namespace, output)?;
            Ok(0)
        }
    }
}
