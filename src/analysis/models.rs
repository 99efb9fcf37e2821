use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A contiguous, line-bounded slice of one file's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisChunk {
    pub content: String,
    /// 1-based line of the original file where this chunk begins.
    pub start_line: usize,
}

impl AnalysisChunk {
    /// Number of `\n`-separated lines in the chunk.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }

    /// Inclusive absolute line where the chunk ends.
    #[must_use]
    pub fn end_line(&self) -> usize {
        self.start_line + self.line_count() - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Lenient conversion used on model output; unknown labels become `Medium`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Medium,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Performance,
    Logic,
    Quality,
}

impl Category {
    /// Lenient conversion used on model output; unknown labels become `Quality`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "security" => Category::Security,
            "performance" => Category::Performance,
            "logic" => Category::Logic,
            _ => Category::Quality,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Security => "security",
            Category::Performance => "performance",
            Category::Logic => "logic",
            Category::Quality => "quality",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding reported by the model.
///
/// `line` is chunk-relative as produced by the parser and file-absolute once
/// it has gone through the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub line: Option<usize>,
    pub severity: Severity,
    pub category: Category,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub suggestion: String,
}

/// The normalized shape of one model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub summary: String,
    pub issues: Vec<Issue>,
    /// True when the reply could not be parsed and this is the fallback value.
    pub degraded: bool,
}

/// Outcome of the deep analysis of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepAnalysisResult {
    pub file: PathBuf,
    pub issues: Vec<Issue>,
    pub summary: String,
    pub complexity: usize,
    pub warnings: Vec<String>,
    pub lines_analyzed: usize,
    pub chunks_processed: usize,
}

impl DeepAnalysisResult {
    /// Placeholder standing in for a file whose analysis failed.
    #[must_use]
    pub fn failed(file: PathBuf, reason: impl fmt::Display) -> Self {
        Self {
            file,
            issues: Vec::new(),
            summary: super::FILE_ERROR_SUMMARY.to_string(),
            complexity: 0,
            warnings: vec![format!("Analysis failed: {reason}")],
            lines_analyzed: 0,
            chunks_processed: 0,
        }
    }

    /// Whether this is the placeholder produced by [`Self::failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.chunks_processed == 0 && self.summary == super::FILE_ERROR_SUMMARY
    }

    /// Count of issues at the given severity.
    #[must_use]
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Dry-run description of how one file would be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePlan {
    pub file: PathBuf,
    pub total_lines: usize,
    pub lines_analyzed: usize,
    pub chunks: usize,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
