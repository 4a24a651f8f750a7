#![warn(missing_docs)]
//! `schema-studio-tool` - process adapter for the `jsonschema` CLI.
//!
//! [`ProcessTool`] implements [`schema_studio_core::SchemaTool`] by spawning the executable once
//! per invocation with `tokio::process`, capturing stdout and stderr, and enforcing a timeout.

pub mod config;
pub mod process;

pub use config::{DEFAULT_PROGRAM, DEFAULT_TIMEOUT, ToolConfig};
pub use process::ProcessTool;
