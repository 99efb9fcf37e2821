//! # Orion analyzer: chunked deep code analysis
//!
//! Reviews source files with Claude: each file is cut into line-bounded
//! chunks, every chunk is reviewed by the model, and the replies are merged
//! into one result per file with file-absolute line numbers.
//!
//! ## Architecture
//!
//! - **[`config`]**: Configuration loading, validation, and source file discovery
//! - **[`analysis`]**: Chunker, prompt builder, reply parser, aggregator, pipeline
//! - **[`llm`]**: Completion client trait, Anthropic client, rate limiter, scripted fake
//! - **[`report`]**: Markdown / JSON rendering of analysis batches
//! - **[`mcp`]**: MCP server with analysis tool handlers (stdio transport via rmcp)

pub mod analysis;
pub mod config;
pub mod llm;
pub mod mcp;
pub mod report;
