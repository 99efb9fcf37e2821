/// MCP Server setup using `rmcp` with stdio transport.
///
/// Provides `McpContext` (shared state) and `McpServer` (startup logic).
use crate::mcp::tools::AppTools;
use anyhow::{Context, Result};
use rmcp::{ServiceExt, handler::server::router::Router, transport::io::stdio};
use std::sync::Arc;
use tracing::info;

use crate::{config::Config, llm::CompletionClient, llm::rate_limit::RateLimiter};
use tokio::sync::Mutex as TokioMutex;

/// Shared application context available to all tool handlers.
#[derive(Clone)]
pub struct McpContext {
    pub config: Arc<Config>,
    pub client: Arc<dyn CompletionClient>,
    pub limiter: Arc<RateLimiter>,
    /// Held for the duration of a batch so analyses never overlap.
    pub batch_lock: Arc<TokioMutex<()>>,
}

impl McpContext {
    pub fn new(config: Config, client: Arc<dyn CompletionClient>) -> Result<Self> {
        let limiter = RateLimiter::new(config.llm.requests_per_minute)
            .context("failed to build rate limiter")?;
        Ok(Self {
            config: Arc::new(config),
            client,
            limiter: Arc::new(limiter),
            batch_lock: Arc::new(TokioMutex::new(())),
        })
    }
}

/// MCP Server wrapping the context and serving via stdio.
#[derive(Clone)]
pub struct McpServer {
    pub ctx: McpContext,
}

impl McpServer {
    pub fn new(ctx: McpContext) -> Self {
        Self { ctx }
    }

    /// Start the MCP server on stdio transport (blocks until the client disconnects).
    pub async fn start(self) -> Result<()> {
        info!("Starting MCP server on stdio...");
        let (stdin, stdout) = stdio();

        let app_tools = AppTools::new(self.ctx.clone());
        let router = Router::new(app_tools.clone()).with_tools(app_tools.tool_router.clone());

        let service = router
            .serve((stdin, stdout))
            .await
            .context("MCP Server encountered an error during stdio transport")?;
        service
            .waiting()
            .await
            .context("MCP Server terminated abnormally")?;

        Ok(())
    }
}
