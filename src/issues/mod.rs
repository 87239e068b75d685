//! Severity-leveled diagnostics produced by the sanitizers.
//!
//! An [`Issue`] is scoped to a group inside a resource: [`ROOT`] for the
//! resource as a whole, or a container name for container-level findings.

pub mod collector;

pub use collector::{Collector, Outcome, Sections};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Group for issues that concern the resource as a whole.
pub const ROOT: &str = "__root__";

/// Severity levels, ordered `Ok < Info < Warn < Error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Nothing to report
    #[default]
    Ok,
    /// Informational suggestion
    Info,
    /// Potential problem worth a look
    Warn,
    /// Misconfiguration that needs fixing
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single finding. The message is fully rendered at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub group: String,
    pub level: Severity,
    pub message: String,
}

impl Issue {
    pub fn new(group: impl Into<String>, level: Severity, message: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            level,
            message: message.into(),
        }
    }

    /// Whether the issue is about the resource as a whole.
    pub fn is_root(&self) -> bool {
        self.group == ROOT
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "[{}] {}", self.level, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.level, self.group, self.message)
        }
    }
}

/// Issues for one resource, in the order they were raised.
pub type Issues = Vec<Issue>;

/// Highest severity in a list of issues (`Ok` when empty).
pub fn max_severity(issues: &[Issue]) -> Severity {
    issues
        .iter()
        .map(|i| i.level)
        .max()
        .unwrap_or(Severity::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
        assert!(Severity::Info > Severity::Ok);
    }

    #[test]
    fn test_max_severity() {
        assert_eq!(max_severity(&[]), Severity::Ok);

        let issues = vec![
            Issue::new(ROOT, Severity::Info, "a"),
            Issue::new("c1", Severity::Error, "b"),
            Issue::new(ROOT, Severity::Warn, "c"),
        ];
        assert_eq!(max_severity(&issues), Severity::Error);
    }

    #[test]
    fn test_issue_display() {
        let root = Issue::new(ROOT, Severity::Warn, "Zero scale detected");
        assert!(root.is_root());
        assert_eq!(root.to_string(), "[WARN] Zero scale detected");

        let co = Issue::new("c1", Severity::Info, "Unnamed port 80");
        assert_eq!(co.to_string(), "[INFO] c1: Unnamed port 80");
    }
}
