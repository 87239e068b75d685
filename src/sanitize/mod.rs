//! Sanitizers: rule evaluation turning cluster state into graded issues.
//!
//! Each resource kind has one sanitizer. A sanitizer is bound to a shared
//! [`Collector`](crate::issues::Collector) and to a data-access implementation
//! exposing only the capabilities that kind needs (see the traits below). It
//! walks every resource of its kind, runs a fixed sequence of checks and
//! records the findings under the resource FQN.
//!
//! Sanitizers never talk to the cluster. They are synchronous and perform a
//! single deterministic pass per call.

pub mod container;
pub mod deployment;
pub mod pod;
pub mod utilization;

#[cfg(test)]
mod fixtures;

pub use deployment::Deployment;
pub use pod::Pod;

use crate::config::Allocations;
use crate::metrics::PodMetrics;
use k8s_openapi::api::apps::v1::Deployment as DeploymentResource;
use k8s_openapi::api::core::v1::Pod as PodResource;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;

// ============================================================================
// Call options
// ============================================================================

/// Per-call options for a sanitize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Run the over/under allocation analysis. It needs pod metrics and is
    /// off unless asked for.
    pub over_allocs: bool,
}

impl SanitizeOptions {
    pub fn with_over_allocs(mut self) -> Self {
        self.over_allocs = true;
        self
    }
}

// ============================================================================
// Data access capabilities
// ============================================================================

/// Resolves the configured thresholds.
pub trait ResourceLimits {
    /// Utilization band for CPU.
    fn cpu_resource_limits(&self) -> Allocations;

    /// Utilization band for memory.
    fn mem_resource_limits(&self) -> Allocations;

    /// Restart count above which a pod is flagged.
    fn restarts_limit(&self) -> u32;

    /// Percentage of a container CPU limit at which usage is flagged.
    fn pod_cpu_limit(&self) -> f64;

    /// Percentage of a container memory limit at which usage is flagged.
    fn pod_mem_limit(&self) -> f64;
}

/// Enumerates deployments keyed by FQN.
pub trait ListDeployments {
    fn list_deployments(&self) -> BTreeMap<String, &DeploymentResource>;
}

/// Enumerates pods keyed by FQN.
pub trait ListPods {
    fn list_pods(&self) -> BTreeMap<String, &PodResource>;
}

/// Lists the pods of a namespace matched by a label selector.
pub trait ListPodsBySelector {
    fn list_pods_by_selector(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> BTreeMap<String, &PodResource>;
}

/// Lists current pod metrics keyed by pod FQN.
pub trait ListPodsMetrics {
    fn list_pods_metrics(&self) -> BTreeMap<String, &PodMetrics>;
}

/// Everything the deployment sanitizer needs.
pub trait DeploymentLister:
    ListDeployments + ListPodsBySelector + ListPodsMetrics + ResourceLimits
{
}

impl<T> DeploymentLister for T where
    T: ListDeployments + ListPodsBySelector + ListPodsMetrics + ResourceLimits + ?Sized
{
}

/// Everything the pod sanitizer needs.
pub trait PodLister: ListPods + ListPodsMetrics + ResourceLimits {}

impl<T> PodLister for T where T: ListPods + ListPodsMetrics + ResourceLimits + ?Sized {}
