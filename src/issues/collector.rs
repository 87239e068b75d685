//! Thread-safe aggregation of issues per resource.
//!
//! One [`Collector`] may be shared by several sanitizers running in parallel
//! (one per resource kind). Findings are filed under a section named after the
//! resource kind, then by resource FQN, so a deployment and a pod sharing a
//! name never share an entry. Writes are serialized behind a single lock; the
//! driver reads [`Collector::sections`] once every sanitizer has finished.

use super::{Issue, Issues, Severity, max_severity};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Deref;

/// Finalized issues of one section, keyed by resource FQN (`namespace/name`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Outcome(BTreeMap<String, Issues>);

impl Outcome {
    /// Highest severity recorded for a resource (`Ok` when unknown or clean).
    pub fn max_severity(&self, fqn: &str) -> Severity {
        self.0
            .get(fqn)
            .map(|issues| max_severity(issues))
            .unwrap_or(Severity::Ok)
    }

    /// Highest severity across every resource.
    pub fn worst(&self) -> Severity {
        self.0
            .values()
            .map(|issues| max_severity(issues))
            .max()
            .unwrap_or(Severity::Ok)
    }

    /// Keep only issues at or above `level`. Every resource keeps its entry.
    pub fn filter(&self, level: Severity) -> Outcome {
        Outcome(
            self.0
                .iter()
                .map(|(fqn, issues)| {
                    let kept = issues.iter().filter(|i| i.level >= level).cloned().collect();
                    (fqn.clone(), kept)
                })
                .collect(),
        )
    }
}

impl Deref for Outcome {
    type Target = BTreeMap<String, Issues>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<BTreeMap<String, Issues>> for Outcome {
    fn from(map: BTreeMap<String, Issues>) -> Self {
        Self(map)
    }
}

/// Outcomes of every section, keyed by section name (`deployment`, `pod`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Sections(BTreeMap<String, Outcome>);

impl Sections {
    /// Highest severity across every section.
    pub fn worst(&self) -> Severity {
        self.0
            .values()
            .map(Outcome::worst)
            .max()
            .unwrap_or(Severity::Ok)
    }

    /// Filter every section, see [`Outcome::filter`].
    pub fn filter(&self, level: Severity) -> Sections {
        Sections(
            self.0
                .iter()
                .map(|(section, outcome)| (section.clone(), outcome.filter(level)))
                .collect(),
        )
    }

    /// Number of resources across sections.
    pub fn resource_count(&self) -> usize {
        self.0.values().map(|outcome| outcome.len()).sum()
    }
}

impl Deref for Sections {
    type Target = BTreeMap<String, Outcome>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Collects issues raised by sanitizers.
#[derive(Debug, Default)]
pub struct Collector {
    sections: RwLock<BTreeMap<String, BTreeMap<String, Issues>>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `fqn` has an entry in `section`, even if no issue is ever raised for it.
    pub fn init_outcome(&self, section: &str, fqn: &str) {
        self.add_issues(section, fqn, []);
    }

    /// Append an issue for `fqn`. Identical issues are not deduplicated.
    pub fn add_issue(&self, section: &str, fqn: &str, issue: Issue) {
        self.add_issues(section, fqn, [issue]);
    }

    /// Append a batch of issues for `fqn` under a single write.
    pub fn add_issues(&self, section: &str, fqn: &str, issues: impl IntoIterator<Item = Issue>) {
        self.sections
            .write()
            .entry(section.to_string())
            .or_default()
            .entry(fqn.to_string())
            .or_default()
            .extend(issues);
    }

    /// Snapshot of one section. Unknown sections are empty.
    pub fn outcome(&self, section: &str) -> Outcome {
        Outcome(
            self.sections
                .read()
                .get(section)
                .cloned()
                .unwrap_or_default(),
        )
    }

    /// Snapshot of every section.
    pub fn sections(&self) -> Sections {
        Sections(
            self.sections
                .read()
                .iter()
                .map(|(section, map)| (section.clone(), Outcome(map.clone())))
                .collect(),
        )
    }

    /// Number of resources with an entry, across sections.
    pub fn resource_count(&self) -> usize {
        self.sections.read().values().map(|map| map.len()).sum()
    }
}
