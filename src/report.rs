//! Rendering of collected [`Sections`] for humans (text) and machines (JSON).

use crate::error::Result;
use crate::issues::{Issue, Outcome, Sections, Severity, max_severity};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;

/// Per severity tally of resources, by their worst issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub resources: usize,
    pub ok: usize,
    pub info: usize,
    pub warn: usize,
    pub error: usize,
}

impl Summary {
    pub fn from_sections(sections: &Sections) -> Self {
        let mut summary = Summary::default();
        for issues in sections.values().flat_map(|outcome| outcome.values()) {
            summary.resources += 1;
            match max_severity(issues) {
                Severity::Ok => summary.ok += 1,
                Severity::Info => summary.info += 1,
                Severity::Warn => summary.warn += 1,
                Severity::Error => summary.error += 1,
            }
        }
        summary
    }

    /// Share of resources with nothing worse than informational findings.
    pub fn score(&self) -> u8 {
        if self.resources == 0 {
            return 100;
        }
        ((self.ok + self.info) * 100 / self.resources) as u8
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: Summary,
    score: u8,
    sections: &'a Sections,
}

/// Render the sections as pretty JSON.
pub fn render_json(sections: &Sections) -> Result<String> {
    let summary = Summary::from_sections(sections);
    let report = JsonReport {
        summary,
        score: summary.score(),
        sections,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn paint(level: Severity, text: &str) -> String {
    match level {
        Severity::Ok => text.green().to_string(),
        Severity::Info => text.blue().to_string(),
        Severity::Warn => text.yellow().to_string(),
        Severity::Error => text.red().bold().to_string(),
    }
}

fn render_issue(out: &mut String, indent: &str, issue: &Issue) {
    let _ = writeln!(
        out,
        "{}{} {}",
        indent,
        paint(issue.level, &format!("[{}]", issue.level)),
        issue.message
    );
}

fn render_outcome(out: &mut String, outcome: &Outcome) {
    for (fqn, issues) in outcome.iter() {
        let level = outcome.max_severity(fqn);
        let _ = writeln!(out, "  {} {}", paint(level, "\u{25CF}"), fqn.bold());

        if issues.is_empty() {
            let _ = writeln!(out, "      {}", paint(Severity::Ok, "[OK]"));
            continue;
        }

        for issue in issues.iter().filter(|i| i.is_root()) {
            render_issue(out, "      ", issue);
        }

        let mut current_group: Option<&str> = None;
        for issue in issues.iter().filter(|i| !i.is_root()) {
            if current_group != Some(issue.group.as_str()) {
                let _ = writeln!(out, "      {}", issue.group.cyan());
                current_group = Some(issue.group.as_str());
            }
            render_issue(out, "        ", issue);
        }
    }
}

/// Render every section as an indented, colored listing.
pub fn render_text(sections: &Sections) -> String {
    let mut out = String::new();

    for (section, outcome) in sections.iter() {
        let _ = writeln!(
            out,
            "{} ({})",
            section.to_uppercase().bold().underline(),
            outcome.len()
        );
        render_outcome(&mut out, outcome);
        out.push('\n');
    }

    let summary = Summary::from_sections(sections);
    let _ = writeln!(
        out,
        "{} resource(s): {} ok, {} info, {} warn, {} error (score {}%)",
        summary.resources,
        summary.ok,
        summary.info,
        summary.warn,
        summary.error,
        summary.score()
    );

    out
}
