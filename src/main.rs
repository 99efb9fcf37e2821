use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use orion_analyzer::analysis::pipeline::{DeepAnalyzer, plan_files};
use orion_analyzer::config::{Config, collect_source_files};
use orion_analyzer::llm::CompletionClient;
use orion_analyzer::llm::anthropic::AnthropicClient;
use orion_analyzer::llm::rate_limit::RateLimiter;
use orion_analyzer::mcp::server::{McpContext, McpServer};
use orion_analyzer::report::AnalysisReport;

#[derive(Parser)]
#[command(name = "orion", version, about = "Deep code analysis with Claude")]
struct Cli {
    /// Path to the JSON config file (default: orion.json)
    #[arg(short, long, global = true, default_value = "")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Review source files and print a report
    Analyze {
        /// Files to analyze (default: the configured source patterns)
        paths: Vec<PathBuf>,
        /// Analyze every supported file under this directory instead
        #[arg(long, conflicts_with = "paths")]
        dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show how files would be chunked, without calling the model
    Plan {
        paths: Vec<PathBuf>,
        #[arg(long, conflicts_with = "paths")]
        dir: Option<PathBuf>,
    },
    /// Serve the analysis tools over MCP (stdio)
    Serve,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries reports and MCP traffic, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // 1. Load config
    let config = Config::load(&cli.config)?;
    config.validate().context("invalid configuration")?;

    match cli.command {
        Command::Analyze {
            paths,
            dir,
            format,
            output,
        } => {
            let files = resolve_files(&config, paths, dir)?;
            analyze(&config, &files, format, output).await
        }
        Command::Plan { paths, dir } => {
            let files = resolve_files(&config, paths, dir)?;
            let plans = plan_files(&files, &config.analysis);
            println!("{}", serde_json::to_string_pretty(&plans)?);
            Ok(())
        }
        Command::Serve => {
            let client = AnthropicClient::from_config(&config.llm)
                .context("failed to initialize model client")?;
            let ctx = McpContext::new(config, Arc::new(client))?;
            McpServer::new(ctx).start().await
        }
    }
}

fn resolve_files(config: &Config, paths: Vec<PathBuf>, dir: Option<PathBuf>) -> Result<Vec<PathBuf>> {
    if !paths.is_empty() {
        return Ok(paths);
    }
    if let Some(dir) = dir {
        anyhow::ensure!(dir.is_dir(), "directory not found: {}", dir.display());
        return Ok(collect_source_files(&dir, config.max_files));
    }
    Ok(config.get_source_files())
}

async fn analyze(
    config: &Config,
    files: &[PathBuf],
    format: Format,
    output: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(!files.is_empty(), "no supported source files to analyze");

    let client =
        AnthropicClient::from_config(&config.llm).context("failed to initialize model client")?;
    let limiter = RateLimiter::new(config.llm.requests_per_minute)?;
    let analyzer =
        DeepAnalyzer::new(&client, config.analysis.clone()).with_rate_limiter(&limiter);

    info!("Analyzing {} files with {}", files.len(), client.model());
    let results = analyzer.analyze_files(files).await;

    let report = AnalysisReport::new(client.model(), &results);
    let rendered = match format {
        Format::Markdown => report.to_markdown(),
        Format::Json => report.to_json().context("failed to serialize report")?,
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write report: {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
