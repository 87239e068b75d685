use crate::error::{HygieneError, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub allocations: AllocationsConfig,
    pub pod: PodConfig,
    /// Namespaces that are never scanned
    pub excluded_namespaces: Vec<String>,
}

/// Utilization tolerance bands per resource dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AllocationsConfig {
    pub cpu: Allocations,
    pub memory: Allocations,
}

/// Tolerance band around 100% utilization of a request.
///
/// Usage at or above `100 + under_perc` percent of the request is
/// under-allocated; a request at or above `100 + over_perc` percent of usage
/// is over-allocated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocations {
    #[serde(rename = "underPercUtilization")]
    pub under_perc: f64,
    #[serde(rename = "overPercUtilization")]
    pub over_perc: f64,
}

impl Default for Allocations {
    fn default() -> Self {
        Self {
            under_perc: 200.0,
            over_perc: 50.0,
        }
    }
}

/// Pod level ceilings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodConfig {
    /// Restart count above which a pod is flagged
    pub restarts: u32,
    pub limits: PodLimits,
}

impl Default for PodConfig {
    fn default() -> Self {
        Self {
            restarts: 3,
            limits: PodLimits::default(),
        }
    }
}

/// Percentage of a container limit at which usage is flagged
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodLimits {
    pub cpu: f64,
    pub memory: f64,
}

impl Default for PodLimits {
    fn default() -> Self {
        Self {
            cpu: 80.0,
            memory: 80.0,
        }
    }
}

impl Config {
    /// Check the numeric bands before handing the config to the sanitizers.
    pub fn validate(&self) -> Result<()> {
        for (name, allocs) in [
            ("allocations.cpu", &self.allocations.cpu),
            ("allocations.memory", &self.allocations.memory),
        ] {
            check_percentage(&format!("{}.underPercUtilization", name), allocs.under_perc)?;
            check_percentage(&format!("{}.overPercUtilization", name), allocs.over_perc)?;
        }

        for (name, limit) in [
            ("pod.limits.cpu", self.pod.limits.cpu),
            ("pod.limits.memory", self.pod.limits.memory),
        ] {
            check_percentage(name, limit)?;
            if limit > 100.0 {
                return Err(HygieneError::Config(format!(
                    "{} must be at most 100, got {}",
                    name, limit
                )));
            }
        }

        Ok(())
    }

    /// Whether resources in `namespace` should be skipped.
    pub fn is_excluded(&self, namespace: &str) -> bool {
        self.excluded_namespaces.iter().any(|ns| ns == namespace)
    }
}

fn check_percentage(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(HygieneError::Config(format!(
            "{} must be a non-negative percentage, got {}",
            name, value
        )));
    }
    Ok(())
}
