//! Deep analysis pipeline: chunk, prompt, call, parse, aggregate.

pub mod aggregate;
pub mod chunker;
pub mod languages;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompt;

/// Summary carried by the placeholder result of a file that failed.
pub const FILE_ERROR_SUMMARY: &str = "Error al analizar archivo";
