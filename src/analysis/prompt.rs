//! Prompt construction for the per-chunk review request.

use std::path::Path;

use super::languages::LanguageConfig;
use super::models::AnalysisChunk;

/// System prompt sent with every chunk request.
pub const SYSTEM_PROMPT: &str = "You are a senior software engineer performing a rigorous code review. \
You report concrete, verifiable problems only, and you always answer with a single fenced JSON block.";

/// Where a chunk sits within its file.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPosition {
    /// 0-based ordinal of the chunk.
    pub index: usize,
    pub total: usize,
}

/// Renders the review instruction for one chunk.
pub fn build_chunk_prompt(
    file: &Path,
    chunk: &AnalysisChunk,
    position: ChunkPosition,
    max_issues: usize,
) -> String {
    let language = LanguageConfig::get_by_path(file)
        .map(|l| l.name)
        .unwrap_or("");
    let line_count = chunk.line_count();

    format!(
        r#"Analyze the following code from `{file}` (part {part} of {total}, lines {start}-{end} of the file).

Review it for:
- security: injection, unsafe input handling, secrets, broken auth
- performance: needless work, blocking calls, unbounded growth
- logic: bugs, wrong conditions, unhandled errors or edge cases
- quality: readability, duplication, maintainability

Rules:
- Report at most {max_issues} issues, the most important first.
- Line numbers are relative to this fragment: line 1 is the first line shown below (line {start} of the file), line {line_count} is the last.
- severity must be one of: critical, high, medium, low.
- category must be one of: security, performance, logic, quality.
- Every issue needs a description and a suggestion.

{fence}{language}
{code}
{fence}

Respond ONLY with a JSON block in exactly this shape:

```json
{{
  "summary": "One or two sentences describing what this code does and its overall quality",
  "issues": [
    {{
      "line": 1,
      "severity": "high",
      "category": "security",
      "description": "What is wrong",
      "codeSnippet": "the offending code",
      "suggestion": "How to fix it"
    }}
  ]
}}
```"#,
        file = file.display(),
        part = position.index + 1,
        total = position.total,
        start = chunk.start_line,
        end = chunk.end_line(),
        code = chunk.content,
        fence = code_fence(&chunk.content),
    )
}

/// A backtick fence longer than any backtick run inside `code`.
fn code_fence(code: &str) -> String {
    let longest = code
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}
