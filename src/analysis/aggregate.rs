//! Reduction of per-chunk replies into one result per file.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use super::models::{AnalysisChunk, DeepAnalysisResult, Issue, ParsedResponse};

static BRANCH_KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:if|for|while|case)\b").unwrap());

/// Keyword complexity: occurrences of `if`, `for`, `while` and `case`, plus one.
#[must_use]
pub fn complexity_score(code: &str) -> usize {
    BRANCH_KEYWORDS.find_iter(code).count() + 1
}

/// Converts a chunk-relative line into a file line.
///
/// Relative line 1 is the chunk's `start_line`. Lines below 1, and lines
/// whose absolute position would overflow, carry no position and become `None`.
#[must_use]
pub fn to_absolute_line(chunk_start: usize, relative: Option<usize>) -> Option<usize> {
    relative
        .filter(|r| *r >= 1)
        .and_then(|r| chunk_start.checked_add(r - 1))
}

/// Shifts every issue in `parsed` from chunk-relative to file-absolute lines.
#[must_use]
pub fn remap_issues(chunk: &AnalysisChunk, parsed: ParsedResponse) -> Vec<Issue> {
    parsed
        .issues
        .into_iter()
        .map(|mut issue| {
            issue.line = to_absolute_line(chunk.start_line, issue.line);
            issue
        })
        .collect()
}

/// Warning text for a file that was cut before analysis.
#[must_use]
pub fn truncation_warning(lines_analyzed: usize, total_lines: usize) -> String {
    format!(
        "File too large: only the first {lines_analyzed} of {total_lines} lines were analyzed"
    )
}

/// Accumulates chunk outcomes for one file.
pub struct FileAggregator {
    file: PathBuf,
    issues: Vec<Issue>,
    summary: Option<String>,
    warnings: Vec<String>,
    chunks_processed: usize,
}

impl FileAggregator {
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            issues: Vec::new(),
            summary: None,
            warnings: Vec::new(),
            chunks_processed: 0,
        }
    }

    /// Folds in the parsed reply for `chunk`. Chunks must arrive in order;
    /// only the first one contributes the summary.
    pub fn add_chunk(&mut self, chunk: &AnalysisChunk, parsed: ParsedResponse) {
        if self.summary.is_none() {
            self.summary = Some(parsed.summary.clone());
        }
        self.issues.extend(remap_issues(chunk, parsed));
        self.chunks_processed += 1;
    }

    pub fn warn(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Produces the final result for the analyzed text.
    pub fn finish(self, analyzed_text: &str, lines_analyzed: usize) -> DeepAnalysisResult {
        DeepAnalysisResult {
            file: self.file,
            issues: self.issues,
            summary: self.summary.unwrap_or_default(),
            complexity: complexity_score(analyzed_text),
            warnings: self.warnings,
            lines_analyzed,
            chunks_processed: self.chunks_processed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::{Category, Severity};

    fn issue(line: Option<usize>, description: &str) -> Issue {
        Issue {
            line,
            severity: Severity::Low,
            category: Category::Quality,
            description: description.to_string(),
            code_snippet: None,
            suggestion: String::new(),
        }
    }

    fn parsed(summary: &str, issues: Vec<Issue>) -> ParsedResponse {
        ParsedResponse {
            summary: summary.to_string(),
            issues,
            degraded: false,
        }
    }

    #[test]
    fn test_complexity_two_ifs_one_for() {
        let code = "if (a) { x(); }\nfor (i of xs) { if (i) y(); }";
        assert_eq!(complexity_score(code), 4);
    }

    #[test]
    fn test_complexity_whole_words_only() {
        assert_eq!(complexity_score("const diff = format(elsewhile);"), 1);
        assert_eq!(complexity_score(""), 1);
        assert_eq!(complexity_score("switch (x) { case 1: case 2: while (y) {} }"), 4);
    }

    #[test]
    fn test_absolute_line_formula() {
        assert_eq!(to_absolute_line(1, Some(1)), Some(1));
        assert_eq!(to_absolute_line(301, Some(5)), Some(305));
        assert_eq!(to_absolute_line(301, Some(0)), None);
        assert_eq!(to_absolute_line(301, None), None);
        assert_eq!(to_absolute_line(301, Some(usize::MAX)), None);
    }

    #[test]
    fn test_aggregates_in_chunk_order() {
        let first = AnalysisChunk {
            content: "a\nb".to_string(),
            start_line: 1,
        };
        let second = AnalysisChunk {
            content: "c\nd".to_string(),
            start_line: 3,
        };

        let mut agg = FileAggregator::new(PathBuf::from("f.js"));
        agg.add_chunk(&first, parsed("first summary", vec![issue(Some(2), "one")]));
        agg.add_chunk(
            &second,
            parsed(
                "second summary",
                vec![issue(Some(1), "two"), issue(Some(2), "two")],
            ),
        );
        let result = agg.finish("a\nb\nc\nd", 4);

        assert_eq!(result.summary, "first summary");
        assert_eq!(result.chunks_processed, 2);
        assert_eq!(result.lines_analyzed, 4);
        let lines: Vec<_> = result.issues.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![Some(2), Some(3), Some(4)]);
        // no cross-chunk deduplication
        assert_eq!(result.issues.len(), 3);
        assert_eq!(result.complexity, 1);
    }

    #[test]
    fn test_truncation_warning_text() {
        let w = truncation_warning(120, 4000);
        assert!(w.contains("120 of 4000"));
    }
}
