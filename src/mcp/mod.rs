//! MCP surface: shared context, server startup and tool handlers.

pub mod server;
pub mod tools;
