//! Pod metrics as served by the metrics-server (`metrics.k8s.io/v1beta1`).
//!
//! The raw API shape is kept for deserialization (from a live cluster or a
//! snapshot file); sanitizers work on the parsed [`ContainerMetrics`].

use crate::cache::fqn;
use crate::error::Result;
use crate::quantity::{parse_cpu, parse_memory};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics for a single pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodMetrics {
    pub metadata: PodMetricsMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    #[serde(default)]
    pub containers: Vec<ContainerMetricsItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodMetricsMetadata {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Usage reported for one container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerMetricsItem {
    pub name: String,
    pub usage: ContainerUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub cpu: Quantity,
    pub memory: Quantity,
}

/// Parsed usage: CPU in millicores, memory in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub current_cpu: u64,
    pub current_mem: u64,
}

/// Parsed usage keyed by container name.
pub type ContainerMetrics = BTreeMap<String, Metrics>;

impl PodMetrics {
    /// Build metrics for a pod from raw `(container, cpu, memory)` usage strings.
    pub fn new(namespace: &str, name: &str, containers: &[(&str, &str, &str)]) -> Self {
        Self {
            metadata: PodMetricsMetadata {
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
            timestamp: None,
            window: None,
            containers: containers
                .iter()
                .map(|(co, cpu, mem)| ContainerMetricsItem {
                    name: co.to_string(),
                    usage: ContainerUsage {
                        cpu: Quantity(cpu.to_string()),
                        memory: Quantity(mem.to_string()),
                    },
                })
                .collect(),
        }
    }

    pub fn fqn(&self) -> String {
        fqn(&self.metadata.namespace, &self.metadata.name)
    }

    /// Parse the usage of every container.
    pub fn container_metrics(&self) -> Result<ContainerMetrics> {
        self.containers
            .iter()
            .map(|c| {
                let mx = Metrics {
                    current_cpu: parse_cpu(&c.usage.cpu.0)?,
                    current_mem: parse_memory(&c.usage.memory.0)?,
                };
                Ok((c.name.clone(), mx))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MI: u64 = 1024 * 1024;

    #[test]
    fn test_container_metrics() {
        let pmx = PodMetrics::new("default", "p1", &[("i1", "10m", "10Mi"), ("c1", "250000000n", "1Gi")]);

        let cmx = pmx.container_metrics().unwrap();
        assert_eq!(cmx.len(), 2);
        assert_eq!(cmx["i1"], Metrics { current_cpu: 10, current_mem: 10 * MI });
        assert_eq!(cmx["c1"].current_cpu, 250);

        assert_eq!(cmx["c1"].current_mem, 1024 * MI);
        assert_eq!(pmx.fqn(), "default/p1");
    }

    #[test]
    fn test_malformed_usage_is_an_error() {
        let pmx = PodMetrics::new("default", "p1", &[("c1", "lots", "10Mi")]);
        assert!(pmx.container_metrics().is_err());
    }

    #[test]
    fn test_deserialize_metrics_server_payload() {
        let raw = r#"{
            "metadata": {"name": "p1", "namespace": "fred"},
            "timestamp": "2024-01-01T00:00:00Z",
            "window": "30s",
            "containers": [{"name": "c1", "usage": {"cpu": "5m", "memory": "12Ki"}}]
        }"#;

        let pmx: PodMetrics = serde_json::from_str(raw).unwrap();
        assert_eq!(pmx.fqn(), "fred/p1");
        assert_eq!(
            pmx.container_metrics().unwrap()["c1"],
            Metrics { current_cpu: 5, current_mem: 12 * 1024 }
        );
    }
}
