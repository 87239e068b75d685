//! Deployment sanitizer.
//!
//! For every deployment, in order:
//!
//! 1. scale: zero replicas requested
//! 2. availability: replicas requested but none available
//! 3. collisions: the controller hit replica set name collisions
//! 4. containers: image tags, resource declarations and ports of the pod template
//! 5. utilization (opt-in): requests of the selected pods against their usage
//!
//! All checks run for every deployment. Findings for a deployment are
//! committed to the collector only once its whole sequence went through.

use super::container::{check_containers, pod_reserved};
use super::utilization::{self, Dimension};
use super::{DeploymentLister, SanitizeOptions};
use crate::cache::namespaced;
use crate::error::{HygieneError, Result};
use crate::issues::{Collector, Issue, Issues, Outcome, ROOT, Severity};
use crate::metrics::ContainerMetrics;
use k8s_openapi::api::apps::v1::Deployment as DeploymentResource;
use std::collections::BTreeMap;

/// Collector section holding deployment findings.
pub const SECTION: &str = "deployment";

/// Requested versus current usage, summed over a deployment's pods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumptionMetrics {
    pub request_cpu: u64,
    pub request_mem: u64,
    pub current_cpu: u64,
    pub current_mem: u64,
}

/// Sanitizes deployments.
pub struct Deployment<'a, L: ?Sized> {
    collector: &'a Collector,
    lister: &'a L,
}

impl<'a, L> Deployment<'a, L>
where
    L: DeploymentLister + ?Sized,
{
    pub fn new(collector: &'a Collector, lister: &'a L) -> Self {
        Self { collector, lister }
    }

    /// Check every deployment the lister knows about.
    ///
    /// Running it twice against the same collector records the findings twice.
    pub fn sanitize(&self, opts: &SanitizeOptions) -> Result<()> {
        let pods_metrics = self.pods_metrics(opts)?;
        let deployments = self.lister.list_deployments();

        for (fqn, dp) in &deployments {
            let issues = self.check(fqn, dp, &pods_metrics, opts)?;
            log::debug!("Deployment {}: {} issue(s)", fqn, issues.len());
            self.collector.add_issues(SECTION, fqn, issues);
        }

        log::info!("Sanitized {} deployment(s)", deployments.len());
        Ok(())
    }

    /// Everything collected so far.
    pub fn outcome(&self) -> Outcome {
        self.collector.outcome(SECTION)
    }

    fn check(
        &self,
        fqn: &str,
        dp: &DeploymentResource,
        pods_metrics: &BTreeMap<String, ContainerMetrics>,
        opts: &SanitizeOptions,
    ) -> Result<Issues> {
        let spec = dp
            .spec
            .as_ref()
            .ok_or_else(|| HygieneError::missing(fqn, "spec"))?;
        let pod_spec = spec
            .template
            .spec
            .as_ref()
            .ok_or_else(|| HygieneError::missing(fqn, "spec.template.spec"))?;

        let mut issues = Issues::new();
        self.check_deployment(dp, &mut issues);
        check_containers(pod_spec, &mut issues)?;
        if opts.over_allocs {
            self.check_utilization(fqn, dp, pods_metrics, &mut issues)?;
        }

        Ok(issues)
    }

    fn check_deployment(&self, dp: &DeploymentResource, issues: &mut Issues) {
        // The API server defaults an unset replica count to one.
        let replicas = dp.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let status = dp.status.as_ref();
        let available = status.and_then(|s| s.available_replicas).unwrap_or(0);
        let collisions = status.and_then(|s| s.collision_count).unwrap_or(0);

        if replicas == 0 {
            issues.push(Issue::new(ROOT, Severity::Warn, "Zero scale detected"));
        }

        if replicas != 0 && available == 0 {
            issues.push(Issue::new(
                ROOT,
                Severity::Warn,
                "Used? No available replicas found",
            ));
        }

        if collisions > 0 {
            issues.push(Issue::new(
                ROOT,
                Severity::Error,
                format!("ReplicaSet collisions detected ({})", collisions),
            ));
        }
    }

    fn check_utilization(
        &self,
        fqn: &str,
        dp: &DeploymentResource,
        pods_metrics: &BTreeMap<String, ContainerMetrics>,
        issues: &mut Issues,
    ) -> Result<()> {
        let cpu_allocs = self.lister.cpu_resource_limits();
        let mem_allocs = self.lister.mem_resource_limits();

        let mx = self.deployment_usage(fqn, dp, pods_metrics)?;
        log::trace!("Deployment {} consumption {:?}", fqn, mx);

        issues.extend(utilization::check(
            Dimension::Cpu,
            mx.request_cpu,
            mx.current_cpu,
            &cpu_allocs,
        ));
        issues.extend(utilization::check(
            Dimension::Memory,
            mx.request_mem,
            mx.current_mem,
            &mem_allocs,
        ));

        Ok(())
    }

    /// Sum requests and current usage over the pods selected by the deployment.
    /// A pod without metrics contributes no usage.
    pub fn deployment_usage(
        &self,
        fqn: &str,
        dp: &DeploymentResource,
        pods_metrics: &BTreeMap<String, ContainerMetrics>,
    ) -> Result<ConsumptionMetrics> {
        let Some(spec) = dp.spec.as_ref() else {
            return Err(HygieneError::missing(fqn, "spec"));
        };
        let (namespace, _) = namespaced(fqn);

        let mut mx = ConsumptionMetrics::default();
        for (pfqn, pod) in self.lister.list_pods_by_selector(namespace, &spec.selector) {
            let pod_spec = pod
                .spec
                .as_ref()
                .ok_or_else(|| HygieneError::missing(pfqn.as_str(), "spec"))?;
            let reserved = pod_reserved(pod_spec)?;
            mx.request_cpu = mx.request_cpu.saturating_add(reserved.cpu.unwrap_or(0));
            mx.request_mem = mx.request_mem.saturating_add(reserved.memory.unwrap_or(0));

            let Some(cmx) = pods_metrics.get(&pfqn) else {
                log::debug!("No metrics for pod {}", pfqn);
                continue;
            };
            for usage in cmx.values() {
                mx.current_cpu = mx.current_cpu.saturating_add(usage.current_cpu);
                mx.current_mem = mx.current_mem.saturating_add(usage.current_mem);
            }
        }

        Ok(mx)
    }

    fn pods_metrics(&self, opts: &SanitizeOptions) -> Result<BTreeMap<String, ContainerMetrics>> {
        if !opts.over_allocs {
            return Ok(BTreeMap::new());
        }

        self.lister
            .list_pods_metrics()
            .into_iter()
            .map(|(fqn, pmx)| Ok((fqn, pmx.container_metrics()?)))
            .collect()
    }
}
