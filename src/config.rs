/// Configuration module for the analyzer.
///
/// Handles loading, validating, and providing default configuration values,
/// and expands the configured source patterns into the file list.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::languages::is_supported_source;

pub const DEFAULT_CONFIG_PATH: &str = "orion.json";

// ── Default value functions ──────────────────────────────────────────

fn default_source_patterns() -> Vec<String> {
    vec!["./".to_string()]
}

fn default_max_files() -> usize {
    50
}

fn default_max_lines_per_chunk() -> usize {
    300
}

fn default_max_file_bytes() -> usize {
    100_000
}

fn default_max_issues_per_chunk() -> usize {
    10
}

fn default_max_parse_attempts() -> u32 {
    2
}

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-0".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_requests_per_minute() -> u32 {
    50
}

fn default_max_retries() -> u32 {
    2
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Directories or glob patterns to collect source files from.
    #[serde(default = "default_source_patterns")]
    pub source_patterns: Vec<String>,

    /// Upper bound on files per batch.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_lines_per_chunk")]
    pub max_lines_per_chunk: usize,

    /// Files are cut to this many bytes (on a line boundary) before chunking.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,

    #[serde(default = "default_max_issues_per_chunk")]
    pub max_issues_per_chunk: usize,

    /// Total tries per chunk when the reply cannot be parsed.
    #[serde(default = "default_max_parse_attempts")]
    pub max_parse_attempts: u32,

    /// Extra pause between chunk requests of the same file.
    #[serde(default)]
    pub inter_chunk_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            source_patterns: default_source_patterns(),
            max_files: default_max_files(),
            analysis: AnalysisConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_lines_per_chunk: default_max_lines_per_chunk(),
            max_file_bytes: default_max_file_bytes(),
            max_issues_per_chunk: default_max_issues_per_chunk(),
            max_parse_attempts: default_max_parse_attempts(),
            inter_chunk_delay_ms: 0,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            requests_per_minute: default_requests_per_minute(),
            max_retries: default_max_retries(),
            api_key_env: default_api_key_env(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to [`DEFAULT_CONFIG_PATH`].
    /// If the file does not exist, returns a default config and, for the
    /// default path only, writes a template.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let mut cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");

        if cfg.source_patterns.is_empty() {
            cfg.source_patterns = default_source_patterns();
        }

        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_files > 0, "max_files must be positive");
        anyhow::ensure!(
            self.analysis.max_lines_per_chunk > 0,
            "analysis.max_lines_per_chunk must be positive"
        );
        anyhow::ensure!(
            self.analysis.max_file_bytes > 0,
            "analysis.max_file_bytes must be positive"
        );
        anyhow::ensure!(
            self.analysis.max_issues_per_chunk > 0,
            "analysis.max_issues_per_chunk must be positive"
        );
        anyhow::ensure!(
            self.analysis.max_parse_attempts > 0,
            "analysis.max_parse_attempts must be positive"
        );
        anyhow::ensure!(
            self.llm.requests_per_minute > 0,
            "llm.requests_per_minute must be positive"
        );
        anyhow::ensure!(self.llm.max_tokens > 0, "llm.max_tokens must be positive");
        anyhow::ensure!(
            !self.source_patterns.is_empty(),
            "at least one source pattern must be specified"
        );
        Ok(())
    }

    /// Expand all source patterns into a sorted, de-duplicated file list,
    /// capped at `max_files`.
    pub fn get_source_files(&self) -> Vec<PathBuf> {
        let mut files = BTreeSet::new();

        for pattern in &self.source_patterns {
            match expand_pattern(pattern) {
                Ok(matches) => files.extend(matches),
                Err(e) => warn!("Failed to expand pattern {pattern}: {e}"),
            }
        }

        cap_files(files.into_iter().collect(), self.max_files)
    }
}

// ── Pattern helpers ──────────────────────────────────────────────────

/// Collect supported source files under `dir`, honouring `.gitignore`.
pub fn collect_source_files(dir: &Path, max_files: usize) -> Vec<PathBuf> {
    let files: BTreeSet<PathBuf> = walk_sources(dir).into_iter().collect();
    cap_files(files.into_iter().collect(), max_files)
}

fn cap_files(mut files: Vec<PathBuf>, max_files: usize) -> Vec<PathBuf> {
    if files.len() > max_files {
        warn!(
            "Found {} source files, analyzing only the first {max_files}",
            files.len()
        );
        files.truncate(max_files);
    }
    files
}

/// Expand a single pattern to matching source files.
fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    // No wildcards: a directory to walk or a single file
    if !pattern.contains('*') && !pattern.contains('?') {
        let path = Path::new(pattern);
        if path.is_file() {
            return Ok(if is_supported_source(path) {
                vec![path.to_path_buf()]
            } else {
                Vec::new()
            });
        }
        return Ok(walk_sources(path));
    }

    let matches = glob::glob(pattern).context("invalid glob pattern")?;
    let mut files = Vec::new();
    for entry in matches.flatten() {
        if entry.is_file() && is_supported_source(&entry) {
            files.push(entry);
        }
    }
    Ok(files)
}

/// Walk a directory recursively; the walker skips ignored and hidden paths.
fn walk_sources(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkBuilder::new(dir)
        .build()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_supported_source(p))
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────
