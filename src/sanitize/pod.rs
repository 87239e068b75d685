//! Pod sanitizer.
//!
//! Checks the pod phase, the status of each container (readiness, waiting
//! state, restarts), the container declarations and, when metrics are
//! available, how close each container runs to its limits.

use super::container::{check_containers, limits};
use super::{PodLister, SanitizeOptions};
use crate::error::{HygieneError, Result};
use crate::issues::{Collector, Issue, Issues, Outcome, ROOT, Severity};
use crate::metrics::ContainerMetrics;
use k8s_openapi::api::core::v1::{ContainerStatus, Pod as PodResource, PodSpec};

/// Collector section holding pod findings.
pub const SECTION: &str = "pod";

const HAPPY_PHASES: &[&str] = &["Running", "Succeeded"];

/// Sanitizes pods.
pub struct Pod<'a, L: ?Sized> {
    collector: &'a Collector,
    lister: &'a L,
}

impl<'a, L> Pod<'a, L>
where
    L: PodLister + ?Sized,
{
    pub fn new(collector: &'a Collector, lister: &'a L) -> Self {
        Self { collector, lister }
    }

    /// Check every pod the lister knows about.
    pub fn sanitize(&self, _opts: &SanitizeOptions) -> Result<()> {
        let pods = self.lister.list_pods();
        let metrics = self.lister.list_pods_metrics();

        for (fqn, po) in &pods {
            let cmx = metrics
                .get(fqn)
                .map(|pmx| pmx.container_metrics())
                .transpose()?;
            let issues = self.check(fqn, po, cmx.as_ref())?;
            log::debug!("Pod {}: {} issue(s)", fqn, issues.len());
            self.collector.add_issues(SECTION, fqn, issues);
        }

        log::info!("Sanitized {} pod(s)", pods.len());
        Ok(())
    }

    /// Everything collected so far.
    pub fn outcome(&self) -> Outcome {
        self.collector.outcome(SECTION)
    }

    fn check(
        &self,
        fqn: &str,
        po: &PodResource,
        cmx: Option<&ContainerMetrics>,
    ) -> Result<Issues> {
        let spec = po
            .spec
            .as_ref()
            .ok_or_else(|| HygieneError::missing(fqn, "spec"))?;

        let mut issues = Issues::new();
        self.check_status(po, &mut issues);
        check_containers(spec, &mut issues)?;
        if let Some(cmx) = cmx {
            self.check_utilization(spec, cmx, &mut issues)?;
        }

        Ok(issues)
    }

    fn check_status(&self, po: &PodResource, issues: &mut Issues) {
        let Some(status) = po.status.as_ref() else {
            return;
        };

        if let Some(phase) = status.phase.as_deref() {
            if !HAPPY_PHASES.contains(&phase) {
                issues.push(Issue::new(
                    ROOT,
                    Severity::Error,
                    format!("Pod is in an unhappy phase ({})", phase),
                ));
            }
        }

        let limit = self.lister.restarts_limit();
        let statuses = status
            .init_container_statuses
            .iter()
            .flatten()
            .chain(status.container_statuses.iter().flatten());
        for cs in statuses {
            check_container_status(cs, limit, issues);
        }
    }

    fn check_utilization(
        &self,
        spec: &PodSpec,
        cmx: &ContainerMetrics,
        issues: &mut Issues,
    ) -> Result<()> {
        let (cpu_ceiling, mem_ceiling) = (self.lister.pod_cpu_limit(), self.lister.pod_mem_limit());

        // Init containers are done by the time metrics are scraped.
        for co in &spec.containers {
            let Some(mx) = cmx.get(&co.name) else {
                continue;
            };
            let lim = limits(co)?;

            if let Some(pct) = percent_of(mx.current_cpu, lim.cpu) {
                if pct >= cpu_ceiling {
                    issues.push(Issue::new(
                        &co.name,
                        Severity::Warn,
                        format!("CPU threshold ({}%) reached {:.2}%", cpu_ceiling, pct),
                    ));
                }
            }
            if let Some(pct) = percent_of(mx.current_mem, lim.memory) {
                if pct >= mem_ceiling {
                    issues.push(Issue::new(
                        &co.name,
                        Severity::Warn,
                        format!("Memory threshold ({}%) reached {:.2}%", mem_ceiling, pct),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn check_container_status(cs: &ContainerStatus, restarts_limit: u32, issues: &mut Issues) {
    let state = cs.state.as_ref();

    if let Some(waiting) = state.and_then(|s| s.waiting.as_ref()) {
        let reason = waiting.reason.as_deref().unwrap_or("Unknown");
        issues.push(Issue::new(
            &cs.name,
            Severity::Warn,
            format!("Container is waiting ({})", reason),
        ));
    } else if state.and_then(|s| s.running.as_ref()).is_some() && !cs.ready {
        issues.push(Issue::new(&cs.name, Severity::Error, "Container is not ready"));
    }

    if cs.restart_count > 0 && cs.restart_count as u32 > restarts_limit {
        issues.push(Issue::new(
            &cs.name,
            Severity::Warn,
            format!("Pod was restarted ({}) times", cs.restart_count),
        ));
    }
}

fn percent_of(current: u64, limit: Option<u64>) -> Option<f64> {
    match limit {
        Some(limit) if limit > 0 => Some(current as f64 / limit as f64 * 100.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PodMetrics;
    use crate::sanitize::fixtures::{CoOpts, MockLister, make_pod};
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateRunning, ContainerStateWaiting, PodStatus,
    };

    fn running(name: &str, ready: bool, restarts: i32) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            ready,
            restart_count: restarts,
            state: Some(ContainerState {
                running: Some(ContainerStateRunning::default()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn with_status(mut po: PodResource, phase: &str, statuses: Vec<ContainerStatus>) -> PodResource {
        po.status = Some(PodStatus {
            phase: Some(phase.to_string()),
            container_statuses: Some(statuses),
            ..Default::default()
        });
        po
    }

    fn run(lister: &MockLister) -> Issues {
        let c = Collector::new();
        let po = Pod::new(&c, lister);
        po.sanitize(&SanitizeOptions::default()).unwrap();
        po.outcome()["default/p1"].clone()
    }

    fn guaranteed() -> CoOpts {
        CoOpts::new("fred:0.0.1").resources("10m", "10Mi", "10m", "10Mi")
    }

    #[test]
    fn test_healthy_pod() {
        let po = with_status(make_pod("p1", &guaranteed()), "Running", vec![running("c1", true, 0)]);
        let lister = MockLister::default().with_pod(po);

        assert!(run(&lister).is_empty());
    }

    #[test]
    fn test_pod_status() {
        let po = with_status(
            make_pod("p1", &guaranteed()),
            "Pending",
            vec![
                running("c1", false, 11),
                ContainerStatus {
                    name: "c2".to_string(),
                    state: Some(ContainerState {
                        waiting: Some(ContainerStateWaiting {
                            reason: Some("CrashLoopBackOff".to_string()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ],
        );
        let lister = MockLister::default().with_pod(po);

        assert_eq!(
            run(&lister),
            vec![
                Issue::new(ROOT, Severity::Error, "Pod is in an unhappy phase (Pending)"),
                Issue::new("c1", Severity::Error, "Container is not ready"),
                Issue::new("c1", Severity::Warn, "Pod was restarted (11) times"),
                Issue::new("c2", Severity::Warn, "Container is waiting (CrashLoopBackOff)"),
            ]
        );
    }

    #[test]
    fn test_restarts_at_limit_are_fine() {
        let po = with_status(make_pod("p1", &guaranteed()), "Running", vec![running("c1", true, 10)]);
        let lister = MockLister::default().with_pod(po);

        assert!(run(&lister).is_empty());
    }

    #[test]
    fn test_pod_containers() {
        let lister = MockLister::default().with_pod(make_pod("p1", &CoOpts::new("fred")));

        assert_eq!(
            run(&lister),
            vec![
                Issue::new("i1", Severity::Error, "Untagged docker image in use"),
                Issue::new("i1", Severity::Warn, "No resources defined"),
                Issue::new("c1", Severity::Error, "Untagged docker image in use"),
                Issue::new("c1", Severity::Warn, "No resources defined"),
            ]
        );
    }

    #[test]
    fn test_pod_utilization_against_limits() {
        let co = CoOpts::new("fred:0.0.1").resources("10m", "10Mi", "20m", "20Mi");
        let lister = MockLister::default()
            .with_pod(make_pod("p1", &co))
            .with_metrics(PodMetrics::new("default", "p1", &[("c1", "30m", "10Mi")]));

        // Ceilings are 100% in the mock lister.
        assert_eq!(
            run(&lister),
            vec![Issue::new("c1", Severity::Warn, "CPU threshold (100%) reached 150.00%")]
        );
    }
}
