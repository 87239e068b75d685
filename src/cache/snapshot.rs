//! Cluster snapshots stored on disk.
//!
//! A snapshot is a YAML or JSON document with three lists:
//!
//! ```yaml
//! deployments: []   # apps/v1 Deployment objects
//! pods: []          # v1 Pod objects
//! podMetrics: []    # metrics.k8s.io/v1beta1 PodMetrics objects
//! ```

use crate::error::Result;
use crate::metrics::PodMetrics;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub deployments: Vec<Deployment>,
    pub pods: Vec<Pod>,
    pub pod_metrics: Vec<PodMetrics>,
}

impl Snapshot {
    /// Read a snapshot; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }

    /// Write the snapshot as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
