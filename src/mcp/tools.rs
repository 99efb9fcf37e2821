/// MCP Tool handlers for the analyzer.
///
/// 1. analyze_files     – deep analysis of explicit files
/// 2. analyze_directory – deep analysis of a directory's source files
/// 3. plan_analysis     – chunking dry run, no model calls
use crate::analysis::pipeline::{DeepAnalyzer, plan_files};
use crate::config::collect_source_files;
use crate::mcp::server::McpContext;
use crate::report::AnalysisReport;
use rmcp::handler::server::ServerHandler;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{ErrorData as McpError, handler::server::tool::ToolRouter, model::*, tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Parameter structs ────────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
struct AnalyzeFilesParams {
    /// Files to analyze (comma-separated paths)
    filepaths: String,
}

#[derive(Deserialize, JsonSchema)]
struct AnalyzeDirectoryParams {
    /// Directory to analyze recursively (.gitignore is respected)
    directory: String,
    /// Max files to analyze (default: config max_files)
    max_files: Option<usize>,
}

#[derive(Deserialize, JsonSchema)]
struct PlanParams {
    /// Files to plan (comma-separated paths)
    filepaths: Option<String>,
    /// Directory to plan recursively
    directory: Option<String>,
}

// ── Response helpers ─────────────────────────────────────────────────

fn json_result(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&value).unwrap_or_default(),
    )]))
}

fn error_result(msg: &str) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg.to_string())]))
}

fn split_paths(list: &str) -> Vec<PathBuf> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

// ── Tool implementations ─────────────────────────────────────────────

#[derive(Clone)]
pub struct AppTools {
    pub ctx: McpContext,
    pub tool_router: ToolRouter<Self>,
}

impl ServerHandler for AppTools {}

impl AppTools {
    /// Runs one batch under the batch lock and renders it as JSON.
    async fn run_batch(&self, files: &[PathBuf]) -> Result<CallToolResult, McpError> {
        let _guard = self.ctx.batch_lock.lock().await;

        let analyzer = DeepAnalyzer::new(&*self.ctx.client, self.ctx.config.analysis.clone())
            .with_rate_limiter(&self.ctx.limiter);
        let results = analyzer.analyze_files(files).await;

        let report = AnalysisReport::new(self.ctx.client.model(), &results);
        let value = serde_json::to_value(&report)
            .map_err(|e| McpError::internal_error(format!("serialize failed: {e}"), None))?;
        json_result(value)
    }
}

#[tool_router]
impl AppTools {
    pub fn new(ctx: McpContext) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    // ── Tool 1: analyze_files ───────────────────────────────────────

    #[tool(
        description = "Deep code review of the given source files with Claude. Large files are split into chunks; returns issues (line, severity, category, description, suggestion), a summary and a complexity score per file."
    )]
    async fn analyze_files(
        &self,
        params: Parameters<AnalyzeFilesParams>,
    ) -> Result<CallToolResult, McpError> {
        let files = split_paths(&params.0.filepaths);
        if files.is_empty() {
            return error_result("filepaths is required");
        }
        if files.len() > self.ctx.config.max_files {
            return error_result(&format!(
                "too many files: {} (max {})",
                files.len(),
                self.ctx.config.max_files
            ));
        }

        self.run_batch(&files).await
    }

    // ── Tool 2: analyze_directory ───────────────────────────────────

    #[tool(
        description = "Deep code review of every supported source file under a directory (respects .gitignore, capped at max_files)."
    )]
    async fn analyze_directory(
        &self,
        params: Parameters<AnalyzeDirectoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        if p.directory.is_empty() {
            return error_result("directory is required");
        }
        let dir = Path::new(&p.directory);
        if !dir.is_dir() {
            return error_result(&format!("directory not found: {}", p.directory));
        }

        let max_files = p
            .max_files
            .unwrap_or(self.ctx.config.max_files)
            .min(self.ctx.config.max_files);
        let files = collect_source_files(dir, max_files);
        if files.is_empty() {
            return json_result(serde_json::json!({
                "success": true,
                "message": "No supported source files found",
            }));
        }

        self.run_batch(&files).await
    }

    // ── Tool 3: plan_analysis ───────────────────────────────────────

    #[tool(
        description = "Show how files would be chunked for deep analysis (lines, chunks, truncation) without calling the model."
    )]
    async fn plan_analysis(
        &self,
        params: Parameters<PlanParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let files = match (&p.filepaths, &p.directory) {
            (Some(list), _) => split_paths(list),
            (None, Some(dir)) => collect_source_files(Path::new(dir), self.ctx.config.max_files),
            (None, None) => return error_result("filepaths or directory is required"),
        };

        let plans = plan_files(&files, &self.ctx.config.analysis);
        let total_chunks: usize = plans.iter().map(|plan| plan.chunks).sum();

        json_result(serde_json::json!({
            "files": plans,
            "total_files": plans.len(),
            "total_requests": total_chunks,
        }))
    }
}
