//! Allocation versus utilization analysis.
//!
//! Compares the requested amount of a resource dimension with what is
//! currently used and grades the gap against a configured tolerance band.
//! The request is the baseline, never the limit.

use crate::config::Allocations;
use crate::issues::{Issue, ROOT, Severity};
use crate::quantity::{format_cpu, format_memory};
use std::fmt;

/// Resource dimension under analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Millicores
    Cpu,
    /// Bytes
    Memory,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Memory => "Memory",
        }
    }

    /// Render an amount in the dimension's native notation.
    pub fn format(&self, amount: u64) -> String {
        match self {
            Self::Cpu => format_cpu(amount),
            Self::Memory => format_memory(amount),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict of a utilization analysis, carrying the reported ratio in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Allocation {
    /// Usage exceeds the request beyond tolerance: `current / requested`.
    Under(f64),
    /// The request exceeds usage beyond tolerance: `requested / current`.
    Over(f64),
}

/// Classify usage against a request.
///
/// Returns `None` when there is no request to compare against or when usage
/// sits inside the band. Under-allocation is checked first, so at most one
/// verdict is produced. No usage at all against a non-zero request is
/// over-allocated with an infinite ratio.
pub fn classify(requested: u64, current: u64, allocs: &Allocations) -> Option<Allocation> {
    if requested == 0 {
        return None;
    }

    let (requested, current) = (requested as f64, current as f64);

    let under = current / requested * 100.0;
    if under >= 100.0 + allocs.under_perc {
        return Some(Allocation::Under(under));
    }

    let over = if current == 0.0 {
        f64::INFINITY
    } else {
        requested / current * 100.0
    };
    if over >= 100.0 + allocs.over_perc {
        return Some(Allocation::Over(over));
    }

    None
}

/// Grade a dimension and render the finding, if any, as a root level warning.
pub fn check(
    dimension: Dimension,
    requested: u64,
    current: u64,
    allocs: &Allocations,
) -> Option<Issue> {
    let (direction, ratio) = match classify(requested, current, allocs)? {
        Allocation::Under(ratio) => ("under", ratio),
        Allocation::Over(ratio) => ("over", ratio),
    };

    Some(Issue::new(
        ROOT,
        Severity::Warn,
        format!(
            "At current load, {} {} allocated. Current:{} vs Requested:{} ({:.2}%)",
            dimension,
            direction,
            dimension.format(current),
            dimension.format(requested),
            ratio
        ),
    ))
}
