use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::aggregate::{FileAggregator, truncation_warning};
use super::chunker::{count_lines, split_into_chunks, truncate_to_bytes};
use super::models::{DeepAnalysisResult, FilePlan, ParsedResponse};
use super::parser::parse_response;
use super::prompt::{ChunkPosition, SYSTEM_PROMPT, build_chunk_prompt};
use crate::config::AnalysisConfig;
use crate::llm::rate_limit::RateLimiter;
use crate::llm::{CompletionClient, LlmError};

const PARSE_RETRY_BASE_MS: u64 = 250;
const PARSE_RETRY_JITTER_MS: u64 = 100;

/// Failure of a whole file. The batch turns these into placeholder results.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model request failed for {}: {source}", path.display())]
    Llm {
        path: PathBuf,
        #[source]
        source: LlmError,
    },
}

/// Runs the deep analysis over files, strictly one file and one chunk at a time.
pub struct DeepAnalyzer<'a, C: CompletionClient + ?Sized> {
    pub client: &'a C,
    pub config: AnalysisConfig,
    limiter: Option<&'a RateLimiter>,
}

impl<'a, C: CompletionClient + ?Sized> DeepAnalyzer<'a, C> {
    pub fn new(client: &'a C, config: AnalysisConfig) -> Self {
        Self {
            client,
            config,
            limiter: None,
        }
    }

    /// Gate every model request behind `limiter`.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: &'a RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Analyzes every path in order. Always returns one result per path;
    /// a file that fails yields a placeholder carrying the error as a warning.
    pub async fn analyze_files<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<DeepAnalysisResult> {
        let mut results = Vec::with_capacity(paths.len());

        for (i, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            info!("Analyzing {} ({}/{})", path.display(), i + 1, paths.len());

            match self.analyze_file(path).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("{e}");
                    results.push(DeepAnalysisResult::failed(path.to_path_buf(), &e));
                }
            }
        }

        results
    }

    /// Analyzes a single file.
    pub async fn analyze_file(&self, path: &Path) -> Result<DeepAnalysisResult, AnalysisError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AnalysisError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let total_lines = count_lines(&content);
        let (analyzed, truncated) = truncate_to_bytes(&content, self.config.max_file_bytes);
        let lines_analyzed = count_lines(analyzed);
        let chunks = split_into_chunks(analyzed, self.config.max_lines_per_chunk);

        let mut aggregator = FileAggregator::new(path.to_path_buf());
        if truncated {
            aggregator.warn(truncation_warning(lines_analyzed, total_lines));
        }
        if chunks.is_empty() {
            aggregator.warn("File is empty, nothing to analyze".to_string());
        }

        let delay = Duration::from_millis(self.config.inter_chunk_delay_ms);
        for (index, chunk) in chunks.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let position = ChunkPosition {
                index,
                total: chunks.len(),
            };
            let prompt =
                build_chunk_prompt(path, chunk, position, self.config.max_issues_per_chunk);

            let parsed = self
                .request_chunk(&prompt)
                .await
                .map_err(|source| AnalysisError::Llm {
                    path: path.to_path_buf(),
                    source,
                })?;

            if parsed.degraded {
                aggregator.warn(format!(
                    "Could not parse the model reply for lines {}-{}",
                    chunk.start_line,
                    chunk.end_line()
                ));
            }
            debug!(
                "{}: chunk {}/{} returned {} issues",
                path.display(),
                index + 1,
                chunks.len(),
                parsed.issues.len()
            );
            aggregator.add_chunk(chunk, parsed);
        }

        Ok(aggregator.finish(analyzed, lines_analyzed))
    }

    /// Sends one chunk prompt, re-asking while the reply is unparseable.
    async fn request_chunk(&self, prompt: &str) -> Result<ParsedResponse, LlmError> {
        let max_attempts = self.config.max_parse_attempts.max(1);
        let mut attempt = 1;

        loop {
            if let Some(limiter) = self.limiter {
                if !limiter.try_acquire() {
                    debug!("Request rate limit reached, waiting for a permit");
                    limiter.acquire().await;
                }
            }

            let reply = self.client.complete(SYSTEM_PROMPT, prompt).await?;
            let parsed = parse_response(&reply);
            if !parsed.degraded || attempt >= max_attempts {
                return Ok(parsed);
            }

            let wait = parse_retry_delay(attempt);
            debug!("Unparseable reply from {}, retrying in {wait:?}", self.client.model());
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

/// Exponential backoff with random jitter for parse retries.
fn parse_retry_delay(attempt: u32) -> Duration {
    let base = PARSE_RETRY_BASE_MS * 2u64.pow(attempt.saturating_sub(1).min(5));
    let jitter = rand::rng().random_range(0..=PARSE_RETRY_JITTER_MS);
    Duration::from_millis(base + jitter)
}

/// Describes how each file would be chunked, without calling the model.
pub fn plan_files<P: AsRef<Path>>(paths: &[P], config: &AnalysisConfig) -> Vec<FilePlan> {
    paths
        .iter()
        .map(|p| plan_file(p.as_ref(), config))
        .collect()
}

fn plan_file(path: &Path, config: &AnalysisConfig) -> FilePlan {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let (analyzed, truncated) = truncate_to_bytes(&content, config.max_file_bytes);
            FilePlan {
                file: path.to_path_buf(),
                total_lines: count_lines(&content),
                lines_analyzed: count_lines(analyzed),
                chunks: split_into_chunks(analyzed, config.max_lines_per_chunk).len(),
                truncated,
                error: None,
            }
        }
        Err(e) => FilePlan {
            file: path.to_path_buf(),
            total_lines: 0,
            lines_analyzed: 0,
            chunks: 0,
            truncated: false,
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FILE_ERROR_SUMMARY;
    use crate::analysis::models::Severity;
    use crate::analysis::parser::PARSE_ERROR_SUMMARY;
    use crate::llm::mock::ScriptedClient;
    use std::fs;
    use tempfile::tempdir;

    fn small_chunks() -> AnalysisConfig {
        AnalysisConfig {
            max_lines_per_chunk: 2,
            ..AnalysisConfig::default()
        }
    }

    fn reply(summary: &str, line: usize) -> String {
        format!(
            "```json\n{{\"summary\": \"{summary}\", \"issues\": [{{\"line\": {line}, \"severity\": \"high\", \"category\": \"logic\", \"description\": \"d{line}\", \"suggestion\": \"s\"}}]}}\n```"
        )
    }

    #[tokio::test]
    async fn test_issue_lines_become_absolute() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.js");
        fs::write(&file, "a();\nb();\nif (c) d();").unwrap();

        let client = ScriptedClient::default()
            .then_reply(reply("first", 2))
            .then_reply(reply("second", 1));
        let analyzer = DeepAnalyzer::new(&client, small_chunks());

        let result = analyzer.analyze_file(&file).await.unwrap();
        assert_eq!(result.chunks_processed, 2);
        assert_eq!(result.lines_analyzed, 3);
        assert_eq!(result.summary, "first");
        assert_eq!(result.complexity, 2);
        let lines: Vec<_> = result.issues.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![Some(2), Some(3)]);
        assert_eq!(result.count_by_severity(Severity::High), 2);
        assert!(result.warnings.is_empty());

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("part 2 of 2"));
        assert!(prompts[1].contains("if (c) d();"));
    }

    #[tokio::test]
    async fn test_out_of_range_line_keeps_batch_alive() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("huge.js");
        fs::write(&file, "a();\nb();\nc();").unwrap();

        let client = ScriptedClient::default()
            .then_reply(reply("first", 1))
            .then_reply(r#"{"summary": "s", "issues": [{"line": 1e30, "description": "d"}, {"line": 18446744073709551615, "description": "e"}]}"#);
        let analyzer = DeepAnalyzer::new(&client, small_chunks());

        let results = analyzer.analyze_files(&[&file]).await;
        assert_eq!(results.len(), 1);
        let lines: Vec<_> = results[0].issues.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![Some(1), None, None]);
    }

    #[tokio::test]
    async fn test_failed_file_does_not_abort_batch() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.ts");
        let present = dir.path().join("ok.ts");
        fs::write(&present, "const x = 1;").unwrap();

        let client = ScriptedClient::default().then_reply(reply("fine", 1));
        let analyzer = DeepAnalyzer::new(&client, AnalysisConfig::default());

        let results = analyzer.analyze_files(&[&missing, &present]).await;
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].file, missing);
        assert!(results[0].issues.is_empty());
        assert!(!results[0].warnings.is_empty());
        assert_eq!(results[0].summary, FILE_ERROR_SUMMARY);

        assert_eq!(results[1].file, present);
        assert_eq!(results[1].issues.len(), 1);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_becomes_placeholder() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.py");
        let b = dir.path().join("b.py");
        fs::write(&a, "x = 1\ny = 2\nz = 3").unwrap();
        fs::write(&b, "w = 4").unwrap();

        let client = ScriptedClient::default()
            .then_reply(reply("a1", 1))
            .then_fail("connection reset");
        let analyzer = DeepAnalyzer::new(&client, small_chunks());

        let results = analyzer.analyze_files(&[&a, &b]).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].issues.is_empty());
        assert!(results[0].warnings[0].contains("connection reset"));
        assert_eq!(results[1].chunks_processed, 1);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_retried_then_degraded() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("x.rs");
        fs::write(&file, "fn main() {}").unwrap();

        let client = ScriptedClient::new("still not json").then_reply("nope");
        let analyzer = DeepAnalyzer::new(&client, AnalysisConfig::default());

        let result = analyzer.analyze_file(&file).await.unwrap();
        assert_eq!(client.call_count(), 2);
        assert_eq!(result.summary, PARSE_ERROR_SUMMARY);
        assert!(result.issues.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("x.rs");
        fs::write(&file, "fn main() {}").unwrap();

        let client = ScriptedClient::default()
            .then_reply("garbled")
            .then_reply(reply("recovered", 1));
        let analyzer = DeepAnalyzer::new(&client, AnalysisConfig::default());

        let result = analyzer.analyze_file(&file).await.unwrap();
        assert_eq!(result.summary, "recovered");
        assert_eq!(result.issues.len(), 1);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_large_file_truncated_with_warning() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("big.js");
        let text = (0..100).map(|i| format!("line{i:03}")).collect::<Vec<_>>().join("\n");
        fs::write(&file, &text).unwrap();

        let config = AnalysisConfig {
            max_file_bytes: 80,
            max_lines_per_chunk: 5,
            ..AnalysisConfig::default()
        };
        let client = ScriptedClient::default();
        let analyzer = DeepAnalyzer::new(&client, config);

        let result = analyzer.analyze_file(&file).await.unwrap();
        // 8 bytes per line incl. newline: 10 whole lines fit in 80 bytes
        assert_eq!(result.lines_analyzed, 10);
        assert_eq!(result.chunks_processed, 2);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("10 of 100"));
    }

    #[tokio::test]
    async fn test_empty_file_makes_no_requests() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("empty.go");
        fs::write(&file, "").unwrap();

        let client = ScriptedClient::default();
        let analyzer = DeepAnalyzer::new(&client, AnalysisConfig::default());

        let result = analyzer.analyze_file(&file).await.unwrap();
        assert_eq!(client.call_count(), 0);
        assert_eq!(result.chunks_processed, 0);
        assert_eq!(result.lines_analyzed, 0);
    }

    #[tokio::test]
    async fn test_rate_limited_analyzer() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("r.js");
        fs::write(&file, "a\nb\nc\nd").unwrap();

        let client = ScriptedClient::default();
        let limiter = RateLimiter::new(60).unwrap();
        let analyzer = DeepAnalyzer::new(&client, small_chunks()).with_rate_limiter(&limiter);

        let result = analyzer.analyze_file(&file).await.unwrap();
        assert_eq!(result.chunks_processed, 2);
        assert_eq!(client.call_count(), 2);
    }

    #[test]
    fn test_plan_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("p.ts");
        fs::write(&file, "1\n2\n3\n4\n5").unwrap();
        let missing = dir.path().join("gone.ts");

        let plans = plan_files(&[&file, &missing], &small_chunks());
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].total_lines, 5);
        assert_eq!(plans[0].chunks, 3);
        assert!(!plans[0].truncated);
        assert!(plans[1].error.is_some());
    }

    #[test]
    fn test_parse_retry_delay_grows() {
        let first = parse_retry_delay(1);
        let second = parse_retry_delay(2);
        assert!(first >= Duration::from_millis(PARSE_RETRY_BASE_MS));
        assert!(second >= Duration::from_millis(PARSE_RETRY_BASE_MS * 2));
    }
}
