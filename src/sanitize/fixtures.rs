//! Test doubles shared by the sanitizer tests.

use super::container::tests::make_container;
use super::{ListDeployments, ListPods, ListPodsBySelector, ListPodsMetrics, ResourceLimits};
use crate::cache::{fqn, matches_selector};
use crate::config::Allocations;
use crate::metrics::PodMetrics;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
use k8s_openapi::api::core::v1::{Pod, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

/// Container declarations; empty strings are left undeclared.
#[derive(Debug, Clone, Default)]
pub struct CoOpts {
    pub image: &'static str,
    pub rcpu: &'static str,
    pub rmem: &'static str,
    pub lcpu: &'static str,
    pub lmem: &'static str,
}

impl CoOpts {
    pub fn new(image: &'static str) -> Self {
        Self {
            image,
            ..Default::default()
        }
    }

    pub fn resources(
        mut self,
        rcpu: &'static str,
        rmem: &'static str,
        lcpu: &'static str,
        lmem: &'static str,
    ) -> Self {
        self.rcpu = rcpu;
        self.rmem = rmem;
        self.lcpu = lcpu;
        self.lmem = lmem;
        self
    }
}

fn labels() -> BTreeMap<String, String> {
    BTreeMap::from([("fred".to_string(), "blee".to_string())])
}

/// Pod spec with one init container `i1` and one container `c1`.
pub fn make_pod_spec(co: &CoOpts) -> PodSpec {
    let make = |name| make_container(name, co.image, co.rcpu, co.rmem, co.lcpu, co.lmem);
    PodSpec {
        init_containers: Some(vec![make("i1")]),
        containers: vec![make("c1")],
        ..Default::default()
    }
}

pub fn make_pod(name: &str, co: &CoOpts) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            labels: Some(labels()),
            ..Default::default()
        },
        spec: Some(make_pod_spec(co)),
        ..Default::default()
    }
}

pub fn make_dp(name: &str, reps: i32, avail_reps: i32, collisions: i32, co: &CoOpts) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(reps),
            selector: LabelSelector {
                match_labels: Some(labels()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels()),
                    ..Default::default()
                }),
                spec: Some(make_pod_spec(co)),
            },
            ..Default::default()
        }),
        status: Some(DeploymentStatus {
            available_replicas: Some(avail_reps),
            collision_count: Some(collisions),
            ..Default::default()
        }),
    }
}

/// Metrics for a pod whose `i1` and `c1` containers both use `cpu`/`mem`.
pub fn make_mx_pod(name: &str, cpu: &str, mem: &str) -> PodMetrics {
    PodMetrics::new("default", name, &[("i1", cpu, mem), ("c1", cpu, mem)])
}

/// In-memory lister handing out canned resources.
pub struct MockLister {
    pub deployments: BTreeMap<String, Deployment>,
    pub pods: BTreeMap<String, Pod>,
    pub metrics: BTreeMap<String, PodMetrics>,
    pub allocations: Allocations,
    pub restarts: u32,
}

impl Default for MockLister {
    fn default() -> Self {
        Self {
            deployments: BTreeMap::new(),
            pods: BTreeMap::new(),
            metrics: BTreeMap::new(),
            allocations: Allocations {
                under_perc: 100.0,
                over_perc: 50.0,
            },
            restarts: 10,
        }
    }
}

impl MockLister {
    pub fn with_deployment(mut self, dp: Deployment) -> Self {
        let key = fqn("default", dp.metadata.name.as_deref().unwrap_or_default());
        self.deployments.insert(key, dp);
        self
    }

    pub fn with_pod(mut self, po: Pod) -> Self {
        let key = fqn("default", po.metadata.name.as_deref().unwrap_or_default());
        self.pods.insert(key, po);
        self
    }

    pub fn with_metrics(mut self, pmx: PodMetrics) -> Self {
        self.metrics.insert(pmx.fqn(), pmx);
        self
    }
}

impl ResourceLimits for MockLister {
    fn cpu_resource_limits(&self) -> Allocations {
        self.allocations
    }

    fn mem_resource_limits(&self) -> Allocations {
        self.allocations
    }

    fn restarts_limit(&self) -> u32 {
        self.restarts
    }

    fn pod_cpu_limit(&self) -> f64 {
        100.0
    }

    fn pod_mem_limit(&self) -> f64 {
        100.0
    }
}

impl ListDeployments for MockLister {
    fn list_deployments(&self) -> BTreeMap<String, &Deployment> {
        self.deployments.iter().map(|(k, v)| (k.clone(), v)).collect()
    }
}

impl ListPods for MockLister {
    fn list_pods(&self) -> BTreeMap<String, &Pod> {
        self.pods.iter().map(|(k, v)| (k.clone(), v)).collect()
    }
}

impl ListPodsBySelector for MockLister {
    fn list_pods_by_selector(
        &self,
        _namespace: &str,
        selector: &LabelSelector,
    ) -> BTreeMap<String, &Pod> {
        self.pods
            .iter()
            .filter(|(_, po)| matches_selector(selector, po.metadata.labels.as_ref()))
            .map(|(k, v)| (k.clone(), v))
            .collect()
    }
}

impl ListPodsMetrics for MockLister {
    fn list_pods_metrics(&self) -> BTreeMap<String, &PodMetrics> {
        self.metrics.iter().map(|(k, v)| (k.clone(), v)).collect()
    }
}
