//! Handler for the `scan` command.
//!
//! Builds a cluster cache from a snapshot file or a live cluster, runs the
//! deployment and pod sanitizers against one shared collector and renders
//! the findings per resource kind.

use crate::cache::{self, ClusterCache, Snapshot};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::Result;
use crate::issues::{Collector, Sections, Severity};
use crate::report;
use crate::sanitize::{self, ListPodsMetrics, SanitizeOptions};
use std::path::PathBuf;

/// Where the cluster state comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Snapshot(PathBuf),
    Live {
        context: Option<String>,
        namespace: Option<String>,
    },
}

/// Configuration for the scan command
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub source: Source,
    /// Run the utilization checks
    pub over_allocs: bool,
    pub format: OutputFormat,
    /// Hide issues below this level
    pub min_level: Severity,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            source: Source::Live {
                context: None,
                namespace: None,
            },
            over_allocs: false,
            format: OutputFormat::Text,
            min_level: Severity::Ok,
        }
    }
}

/// Result of a scan: the rendered report and the worst level seen.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub rendered: String,
    pub worst: Severity,
}

impl ScanReport {
    /// True when any resource carries an error level issue.
    pub fn has_errors(&self) -> bool {
        self.worst >= Severity::Error
    }
}

/// Run both sanitizers over `cache` and return their findings, one section
/// per resource kind.
///
/// The two sanitizers share one collector and run concurrently. If either
/// fails the whole scan fails.
pub fn sanitize_cluster(cache: &ClusterCache, opts: &SanitizeOptions) -> Result<Sections> {
    let collector = Collector::new();

    let (deployments, pods) = rayon::join(
        || sanitize::Deployment::new(&collector, cache).sanitize(opts),
        || sanitize::Pod::new(&collector, cache).sanitize(opts),
    );
    deployments?;
    pods?;

    log::debug!("Sanitized {} resource(s)", collector.resource_count());
    Ok(collector.sections())
}

fn load_snapshot(source: &Source) -> Result<Snapshot> {
    match source {
        Source::Snapshot(path) => {
            log::info!("Reading snapshot {}", path.display());
            Snapshot::from_path(path)
        }
        Source::Live { context, namespace } => {
            fetch_live(context.as_deref(), namespace.as_deref())
        }
    }
}

/// Fetch a snapshot from a live cluster on a fresh runtime.
pub fn fetch_live(context: Option<&str>, namespace: Option<&str>) -> Result<Snapshot> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let client = cache::live::connect(context).await?;
        cache::live::fetch(&client, namespace).await
    })
}

/// Handle the scan command
pub fn handle_scan(config: Config, options: ScanOptions) -> Result<ScanReport> {
    let snapshot = load_snapshot(&options.source)?;
    let cache = ClusterCache::from_snapshot(snapshot, config)?;

    let mut sanitize_opts = SanitizeOptions::default();
    if options.over_allocs {
        if cache.list_pods_metrics().is_empty() {
            log::warn!("No pod metrics available, every request will look over allocated");
        }
        sanitize_opts = sanitize_opts.with_over_allocs();
    }

    let sections = sanitize_cluster(&cache, &sanitize_opts)?;
    let worst = sections.worst();
    let shown = sections.filter(options.min_level);

    let rendered = match options.format {
        OutputFormat::Text => report::render_text(&shown),
        OutputFormat::Json => report::render_json(&shown)?,
    };

    Ok(ScanReport { rendered, worst })
}

/// Handle the snapshot command
pub fn handle_snapshot(
    context: Option<String>,
    namespace: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let snapshot = fetch_live(context.as_deref(), namespace.as_deref())?;
    let yaml = snapshot.to_yaml()?;

    match output {
        Some(path) => {
            std::fs::write(&path, yaml)?;
            log::info!("Snapshot written to {}", path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}
