//! In-memory cluster cache backing the sanitizers.
//!
//! [`ClusterCache`] holds a point-in-time view of the cluster (loaded from a
//! snapshot file or fetched live) together with the validated configuration,
//! and implements every data access capability the sanitizers consume.

pub mod live;
pub mod snapshot;

pub use snapshot::Snapshot;

use crate::config::{Allocations, Config};
use crate::error::{HygieneError, Result};
use crate::metrics::PodMetrics;
use crate::sanitize::{
    ListDeployments, ListPods, ListPodsBySelector, ListPodsMetrics, ResourceLimits,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

const DEFAULT_NAMESPACE: &str = "default";

// ============================================================================
// Fully qualified names
// ============================================================================

/// Build a fully qualified name `namespace/name`. Cluster scoped resources
/// (empty namespace) are just `name`.
pub fn fqn(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", namespace, name)
    }
}

/// Split a fully qualified name into `(namespace, name)`.
pub fn namespaced(fqn: &str) -> (&str, &str) {
    fqn.split_once('/').unwrap_or(("", fqn))
}

/// Fully qualified name of an object. A missing namespace means `default`.
pub fn meta_fqn(meta: &ObjectMeta) -> Result<String> {
    let name = meta
        .name
        .as_deref()
        .ok_or_else(|| HygieneError::missing("<unnamed>", "metadata.name"))?;
    let namespace = meta.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
    Ok(fqn(namespace, name))
}

// ============================================================================
// Label selectors
// ============================================================================

/// Check whether `labels` satisfy `selector`.
///
/// Supports `matchLabels` and the `In`, `NotIn`, `Exists` and `DoesNotExist`
/// expression operators. A selector without any requirement selects nothing.
pub fn matches_selector(
    selector: &LabelSelector,
    labels: Option<&BTreeMap<String, String>>,
) -> bool {
    let match_labels = selector.match_labels.as_ref().filter(|m| !m.is_empty());
    let expressions = selector
        .match_expressions
        .as_ref()
        .filter(|e| !e.is_empty());
    if match_labels.is_none() && expressions.is_none() {
        return false;
    }

    let get = |key: &str| labels.and_then(|l| l.get(key));

    let labels_ok = match_labels
        .into_iter()
        .flatten()
        .all(|(k, v)| get(k) == Some(v));

    let expressions_ok = expressions.into_iter().flatten().all(|req| {
        let values = req.values.as_deref().unwrap_or_default();
        match req.operator.as_str() {
            "In" => get(&req.key).is_some_and(|v| values.contains(v)),
            "NotIn" => get(&req.key).is_none_or(|v| !values.contains(v)),
            "Exists" => get(&req.key).is_some(),
            "DoesNotExist" => get(&req.key).is_none(),
            other => {
                log::warn!("Unsupported label selector operator {:?}", other);
                false
            }
        }
    });

    labels_ok && expressions_ok
}

// ============================================================================
// Cluster cache
// ============================================================================

/// Point-in-time view of the cluster.
#[derive(Debug, Clone, Default)]
pub struct ClusterCache {
    config: Config,
    deployments: BTreeMap<String, Deployment>,
    pods: BTreeMap<String, Pod>,
    pods_metrics: BTreeMap<String, PodMetrics>,
}

impl ClusterCache {
    /// Create an empty cache. The config is validated up front.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Default::default()
        })
    }

    /// Create a cache holding everything in `snapshot`.
    pub fn from_snapshot(snapshot: Snapshot, config: Config) -> Result<Self> {
        let mut cache = Self::new(config)?;
        for dp in snapshot.deployments {
            cache.insert_deployment(dp)?;
        }
        for po in snapshot.pods {
            cache.insert_pod(po)?;
        }
        for pmx in snapshot.pod_metrics {
            cache.insert_pod_metrics(pmx);
        }

        log::info!(
            "Cached {} deployment(s), {} pod(s), {} pod metric(s)",
            cache.deployments.len(),
            cache.pods.len(),
            cache.pods_metrics.len()
        );
        Ok(cache)
    }

    pub fn insert_deployment(&mut self, dp: Deployment) -> Result<()> {
        let key = meta_fqn(&dp.metadata)?;
        if self.is_excluded(&key) {
            return Ok(());
        }
        self.deployments.insert(key, dp);
        Ok(())
    }

    pub fn insert_pod(&mut self, po: Pod) -> Result<()> {
        let key = meta_fqn(&po.metadata)?;
        if self.is_excluded(&key) {
            return Ok(());
        }
        self.pods.insert(key, po);
        Ok(())
    }

    pub fn insert_pod_metrics(&mut self, pmx: PodMetrics) {
        let key = pmx.fqn();
        if self.is_excluded(&key) {
            return;
        }
        self.pods_metrics.insert(key, pmx);
    }

    fn is_excluded(&self, fqn: &str) -> bool {
        let (namespace, _) = namespaced(fqn);
        let excluded = self.config.is_excluded(namespace);
        if excluded {
            log::trace!("Skipping {} from excluded namespace", fqn);
        }
        excluded
    }
}

impl ResourceLimits for ClusterCache {
    fn cpu_resource_limits(&self) -> Allocations {
        self.config.allocations.cpu
    }

    fn mem_resource_limits(&self) -> Allocations {
        self.config.allocations.memory
    }

    fn restarts_limit(&self) -> u32 {
        self.config.pod.restarts
    }

    fn pod_cpu_limit(&self) -> f64 {
        self.config.pod.limits.cpu
    }

    fn pod_mem_limit(&self) -> f64 {
        self.config.pod.limits.memory
    }
}

impl ListDeployments for ClusterCache {
    fn list_deployments(&self) -> BTreeMap<String, &Deployment> {
        self.deployments
            .iter()
            .map(|(k, v)| (k.clone(), v))
            .collect()
    }
}

impl ListPods for ClusterCache {
    fn list_pods(&self) -> BTreeMap<String, &Pod> {
        self.pods.iter().map(|(k, v)| (k.clone(), v)).collect()
    }
}

impl ListPodsBySelector for ClusterCache {
    fn list_pods_by_selector(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> BTreeMap<String, &Pod> {
        self.pods
            .iter()
            .filter(|(fqn, _)| namespaced(fqn).0 == namespace)
            .filter(|(_, po)| matches_selector(selector, po.metadata.labels.as_ref()))
            .map(|(k, v)| (k.clone(), v))
            .collect()
    }
}

impl ListPodsMetrics for ClusterCache {
    fn list_pods_metrics(&self) -> BTreeMap<String, &PodMetrics> {
        self.pods_metrics
            .iter()
            .map(|(k, v)| (k.clone(), v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn pod(namespace: &str, name: &str, pairs: &[(&str, &str)]) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(labels(pairs)),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn requirement(key: &str, op: &str, values: &[&str]) -> LabelSelectorRequirement {
        LabelSelectorRequirement {
            key: key.to_string(),
            operator: op.to_string(),
            values: (!values.is_empty()).then(|| values.iter().map(|v| v.to_string()).collect()),
        }
    }

    #[test]
    fn test_fqn() {
        assert_eq!(fqn("default", "p1"), "default/p1");
        assert_eq!(fqn("", "n1"), "n1");
        assert_eq!(namespaced("fred/p1"), ("fred", "p1"));
        assert_eq!(namespaced("n1"), ("", "n1"));
    }

    #[test]
    fn test_meta_fqn() {
        let meta = ObjectMeta {
            name: Some("p1".to_string()),
            ..Default::default()
        };
        assert_eq!(meta_fqn(&meta).unwrap(), "default/p1");
        assert!(meta_fqn(&ObjectMeta::default()).is_err());
    }

    #[test]
    fn test_match_labels() {
        let sel = LabelSelector {
            match_labels: Some(labels(&[("app", "fred")])),
            ..Default::default()
        };

        assert!(matches_selector(&sel, Some(&labels(&[("app", "fred"), ("tier", "web")]))));
        assert!(!matches_selector(&sel, Some(&labels(&[("app", "blee")]))));
        assert!(!matches_selector(&sel, None));
        assert!(!matches_selector(&LabelSelector::default(), Some(&labels(&[("app", "fred")]))));
    }

    #[test]
    fn test_match_expressions() {
        let l = labels(&[("app", "fred"), ("tier", "web")]);
        let cases = [
            (requirement("app", "In", &["fred", "blee"]), true),
            (requirement("app", "In", &["blee"]), false),
            (requirement("app", "NotIn", &["blee"]), true),
            (requirement("env", "NotIn", &["prod"]), true),
            (requirement("tier", "Exists", &[]), true),
            (requirement("env", "Exists", &[]), false),
            (requirement("env", "DoesNotExist", &[]), true),
            (requirement("app", "Bogus", &[]), false),
        ];

        for (req, expected) in cases {
            let sel = LabelSelector {
                match_expressions: Some(vec![req.clone()]),
                ..Default::default()
            };
            assert_eq!(matches_selector(&sel, Some(&l)), expected, "{:?}", req);
        }
    }

    #[test]
    fn test_pods_by_selector_are_namespace_scoped() {
        let mut cache = ClusterCache::new(Config::default()).unwrap();
        cache.insert_pod(pod("default", "p1", &[("app", "fred")])).unwrap();
        cache.insert_pod(pod("default", "p2", &[("app", "blee")])).unwrap();
        cache.insert_pod(pod("other", "p3", &[("app", "fred")])).unwrap();

        let sel = LabelSelector {
            match_labels: Some(labels(&[("app", "fred")])),
            ..Default::default()
        };
        let pods = cache.list_pods_by_selector("default", &sel);
        assert_eq!(pods.keys().collect::<Vec<_>>(), vec!["default/p1"]);
        assert_eq!(cache.list_pods().len(), 3);
    }

    #[test]
    fn test_excluded_namespaces_are_not_cached() {
        let config = Config {
            excluded_namespaces: vec!["kube-system".to_string()],
            ..Default::default()
        };
        let mut cache = ClusterCache::new(config).unwrap();
        cache.insert_pod(pod("kube-system", "coredns", &[])).unwrap();
        cache.insert_pod(pod("default", "p1", &[])).unwrap();
        cache.insert_pod_metrics(PodMetrics::new("kube-system", "coredns", &[]));

        assert_eq!(cache.list_pods().keys().collect::<Vec<_>>(), vec!["default/p1"]);
        assert!(cache.list_pods_metrics().is_empty());
    }

    #[test]
    fn test_limits_come_from_config() {
        let mut config = Config::default();
        config.pod.restarts = 7;
        config.allocations.cpu.over_perc = 25.0;
        let cache = ClusterCache::new(config).unwrap();

        assert_eq!(cache.restarts_limit(), 7);
        assert_eq!(cache.cpu_resource_limits().over_perc, 25.0);
        assert_eq!(cache.mem_resource_limits(), Allocations::default());
        assert_eq!(cache.pod_cpu_limit(), 80.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.pod.limits.cpu = -5.0;
        assert!(ClusterCache::new(config).is_err());
    }
}
