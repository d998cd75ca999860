//! Session reports.
//!
//! Rendering reads the stored session only, so the same session always
//! renders to the same text.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::error::DebugResult;
use super::types::DebuggingSession;

/// Output format of a debugging report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
    Html,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            other => Err(format!("unknown report format '{}' (expected markdown, json or html)", other)),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
            Self::Html => write!(f, "html"),
        }
    }
}

pub fn render(session: &DebuggingSession, format: ReportFormat) -> DebugResult<String> {
    Ok(match format {
        ReportFormat::Markdown => markdown(session),
        ReportFormat::Json => serde_json::to_string_pretty(session)?,
        ReportFormat::Html => html(session),
    })
}

// `write!` into a String cannot fail.
fn markdown(session: &DebuggingSession) -> String {
    let summary = &session.summary;
    let mut out = String::new();
    let _ = writeln!(out, "# Constraint Debugging Report: {}", session.table_name);
    let _ = writeln!(out);
    let _ = writeln!(out, "- Session: `{}`", session.session_id);
    let _ = writeln!(out, "- State: {}", session.state);
    let _ = writeln!(out, "- Tests: {}", summary.total_tests);
    let _ = writeln!(out, "- Success rate: {:.1}%", summary.success_rate * 100.0);
    let _ = writeln!(out, "- Bypass rate: {:.1}%", summary.bypass_rate * 100.0);
    let _ = writeln!(out, "- Average time: {:.2} ms", summary.average_execution_time_ms);

    if !session.metrics.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Constraints");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Constraint | Runs | Avg ms | Success | Bypass |");
        let _ = writeln!(out, "|---|---|---|---|---|");
        for (name, metrics) in &session.metrics {
            let _ = writeln!(
                out,
                "| {} | {} | {:.2} | {:.0}% | {:.0}% |",
                name,
                metrics.executions,
                metrics.average_execution_time_ms,
                metrics.success_rate * 100.0,
                metrics.bypass_rate * 100.0
            );
        }
    }

    let issues: Vec<_> = session
        .results
        .iter()
        .flat_map(|r| r.issues.iter().map(move |i| (r, i)))
        .collect();
    if !issues.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Issues");
        let _ = writeln!(out);
        for (result, issue) in issues {
            let _ = writeln!(
                out,
                "- **{}** `{}` row {} ({}): {}. Fix: {}",
                issue.severity, result.constraint_id, result.row_index, issue.kind, issue.message, issue.suggested_fix
            );
        }
    }

    if !summary.recommendations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Recommendations");
        let _ = writeln!(out);
        for recommendation in &summary.recommendations {
            let _ = writeln!(out, "- {}", recommendation);
        }
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn html(session: &DebuggingSession) -> String {
    let summary = &session.summary;
    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(
        out,
        "<html><head><meta charset=\"utf-8\"><title>Constraint Debugging: {}</title></head><body>",
        escape(&session.table_name)
    );
    let _ = writeln!(out, "<h1>Constraint Debugging Report: {}</h1>", escape(&session.table_name));
    let _ = writeln!(out, "<ul>");
    let _ = writeln!(out, "<li>Session: <code>{}</code></li>", escape(&session.session_id));
    let _ = writeln!(out, "<li>State: {}</li>", session.state);
    let _ = writeln!(out, "<li>Tests: {}</li>", summary.total_tests);
    let _ = writeln!(out, "<li>Success rate: {:.1}%</li>", summary.success_rate * 100.0);
    let _ = writeln!(out, "<li>Bypass rate: {:.1}%</li>", summary.bypass_rate * 100.0);
    let _ = writeln!(out, "</ul>");

    let _ = writeln!(out, "<table>");
    let _ = writeln!(
        out,
        "<tr><th>Constraint</th><th>Row</th><th>Handler</th><th>Success</th><th>Issues</th></tr>"
    );
    for result in &session.results {
        let issues: Vec<String> = result
            .issues
            .iter()
            .map(|i| format!("{}: {}", i.severity, escape(&i.message)))
            .collect();
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&result.constraint_id),
            result.row_index,
            escape(result.handler_used.as_deref().unwrap_or("none")),
            if result.success { "yes" } else { "no" },
            issues.join("<br>")
        );
    }
    let _ = writeln!(out, "</table>");

    if !summary.recommendations.is_empty() {
        let _ = writeln!(out, "<h2>Recommendations</h2><ul>");
        for recommendation in &summary.recommendations {
            let _ = writeln!(out, "<li>{}</li>", escape(recommendation));
        }
        let _ = writeln!(out, "</ul>");
    }
    let _ = writeln!(out, "</body></html>");
    out
}
