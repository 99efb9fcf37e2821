/// Rendering of analysis batches for humans (Markdown) and tools (JSON).
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::models::{DeepAnalysisResult, Severity};

/// A finished batch plus the metadata needed to render it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub model: &'a str,
    pub totals: Totals,
    pub results: &'a [DeepAnalysisResult],
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub files: usize,
    pub failed_files: usize,
    pub issues: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub lines_analyzed: usize,
}

impl Totals {
    pub fn from_results(results: &[DeepAnalysisResult]) -> Self {
        let mut t = Totals {
            files: results.len(),
            ..Totals::default()
        };
        for r in results {
            if r.is_failed() {
                t.failed_files += 1;
            }
            t.issues += r.issues.len();
            t.critical += r.count_by_severity(Severity::Critical);
            t.high += r.count_by_severity(Severity::High);
            t.medium += r.count_by_severity(Severity::Medium);
            t.low += r.count_by_severity(Severity::Low);
            t.lines_analyzed += r.lines_analyzed;
        }
        t
    }
}

impl<'a> AnalysisReport<'a> {
    pub fn new(model: &'a str, results: &'a [DeepAnalysisResult]) -> Self {
        Self {
            generated_at: Utc::now(),
            model,
            totals: Totals::from_results(results),
            results,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let t = &self.totals;

        let _ = writeln!(out, "# Deep code analysis\n");
        let _ = writeln!(
            out,
            "Generated {} with `{}`.\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            self.model
        );
        let _ = writeln!(out, "| Files | Failed | Lines | Issues | Critical | High | Medium | Low |");
        let _ = writeln!(out, "|---|---|---|---|---|---|---|---|");
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
            t.files, t.failed_files, t.lines_analyzed, t.issues, t.critical, t.high, t.medium, t.low
        );

        for r in self.results {
            let _ = writeln!(out, "## `{}`\n", r.file.display());
            if !r.summary.is_empty() {
                let _ = writeln!(out, "{}\n", r.summary);
            }
            let _ = writeln!(
                out,
                "Complexity {} · {} lines · {} chunks\n",
                r.complexity, r.lines_analyzed, r.chunks_processed
            );
            for w in &r.warnings {
                let _ = writeln!(out, "> ⚠ {w}");
            }
            if !r.warnings.is_empty() {
                out.push('\n');
            }

            let mut issues: Vec<_> = r.issues.iter().collect();
            issues.sort_by_key(|i| (i.severity, i.line));
            for issue in issues {
                let location = issue
                    .line
                    .map(|l| format!("L{l}"))
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(
                    out,
                    "- **{}** [{}] {}: {}",
                    issue.severity, issue.category, location, issue.description
                );
                if let Some(snippet) = &issue.code_snippet {
                    let _ = writeln!(out, "  - `{}`", snippet.replace('`', "'"));
                }
                if !issue.suggestion.is_empty() {
                    let _ = writeln!(out, "  - Fix: {}", issue.suggestion);
                }
            }
            out.push('\n');
        }

        out
    }
}
