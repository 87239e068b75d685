//! Container level checks shared by every pod-bearing sanitizer.
//!
//! Issues raised here are grouped under the container name.

use crate::error::Result;
use crate::issues::{Issue, Issues, Severity};
use crate::quantity::{parse_cpu, parse_memory};
use k8s_openapi::api::core::v1::{Container, PodSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

/// Quality of service implied by a container's requests and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    /// Neither requests nor limits for CPU or memory
    BestEffort,
    /// Some declarations, requests differ from limits
    Burstable,
    /// CPU and memory requests equal their limits
    Guaranteed,
}

/// CPU (millicores) and memory (bytes) declared for a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceProfile {
    pub cpu: Option<u64>,
    pub memory: Option<u64>,
}

impl ResourceProfile {
    fn from_list(list: Option<&BTreeMap<String, Quantity>>) -> Result<Self> {
        let Some(list) = list else {
            return Ok(Self::default());
        };

        Ok(Self {
            cpu: list.get("cpu").map(|q| parse_cpu(&q.0)).transpose()?,
            memory: list.get("memory").map(|q| parse_memory(&q.0)).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none()
    }
}

/// Declared requests of a container.
pub fn requests(co: &Container) -> Result<ResourceProfile> {
    ResourceProfile::from_list(co.resources.as_ref().and_then(|r| r.requests.as_ref()))
}

/// Declared limits of a container.
pub fn limits(co: &Container) -> Result<ResourceProfile> {
    ResourceProfile::from_list(co.resources.as_ref().and_then(|r| r.limits.as_ref()))
}

/// What the scheduler reserves for a container.
///
/// A dimension with a limit but no request gets the limit as its request, the
/// same defaulting the API server applies. Best-effort containers reserve
/// nothing.
pub fn reserved(co: &Container) -> Result<ResourceProfile> {
    let (req, lim) = (requests(co)?, limits(co)?);
    Ok(ResourceProfile {
        cpu: req.cpu.or(lim.cpu),
        memory: req.memory.or(lim.memory),
    })
}

/// Classify a container's quality of service.
pub fn qos(co: &Container) -> Result<Qos> {
    let (req, lim) = (requests(co)?, limits(co)?);

    if req.is_empty() && lim.is_empty() {
        return Ok(Qos::BestEffort);
    }

    // An undeclared request defaults to the limit.
    let pinned = |req: Option<u64>, lim: Option<u64>| lim.is_some() && (req.is_none() || req == lim);
    if pinned(req.cpu, lim.cpu) && pinned(req.memory, lim.memory) {
        Ok(Qos::Guaranteed)
    } else {
        Ok(Qos::Burstable)
    }
}

/// Total reservation of a pod, init containers included.
pub fn pod_reserved(spec: &PodSpec) -> Result<ResourceProfile> {
    let mut cpu = 0u64;
    let mut memory = 0u64;
    for co in all_containers(spec) {
        let r = reserved(co)?;
        cpu = r.cpu.unwrap_or(0).saturating_add(cpu);
        memory = r.memory.unwrap_or(0).saturating_add(memory);
    }
    Ok(ResourceProfile {
        cpu: Some(cpu),
        memory: Some(memory),
    })
}

/// Init containers first, then regular containers.
pub fn all_containers(spec: &PodSpec) -> impl Iterator<Item = &Container> {
    spec.init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter())
}

/// Run every container check over a pod spec.
pub fn check_containers(spec: &PodSpec, issues: &mut Issues) -> Result<()> {
    for co in all_containers(spec) {
        check_container(co, issues)?;
    }
    Ok(())
}

/// Run every check on one container.
pub fn check_container(co: &Container, issues: &mut Issues) -> Result<()> {
    check_image_tags(co, issues);
    check_resources(co, issues)?;
    check_named_ports(co, issues);
    Ok(())
}

fn check_image_tags(co: &Container, issues: &mut Issues) {
    let Some(image) = co.image.as_deref() else {
        return;
    };

    // Digest pinned images are as specific as it gets.
    if image.contains('@') {
        return;
    }

    // The registry may carry a port, only the last path segment holds the tag.
    let last = image.rsplit('/').next().unwrap_or(image);
    match last.split_once(':') {
        None => issues.push(Issue::new(
            &co.name,
            Severity::Error,
            "Untagged docker image in use",
        )),
        Some((_, "latest")) => issues.push(Issue::new(
            &co.name,
            Severity::Warn,
            "Image tagged latest in use",
        )),
        Some(_) => {}
    }
}

fn check_resources(co: &Container, issues: &mut Issues) -> Result<()> {
    match qos(co)? {
        Qos::BestEffort => {
            issues.push(Issue::new(&co.name, Severity::Warn, "No resources defined"));
        }
        Qos::Burstable if limits(co)?.is_empty() => {
            issues.push(Issue::new(
                &co.name,
                Severity::Info,
                "No resource limits defined",
            ));
        }
        _ => {}
    }
    Ok(())
}

fn check_named_ports(co: &Container, issues: &mut Issues) {
    for port in co.ports.iter().flatten() {
        if port.name.as_deref().is_none_or(str::is_empty) {
            issues.push(Issue::new(
                &co.name,
                Severity::Info,
                format!("Unnamed port {}", port.container_port),
            ));
        }
    }
}
