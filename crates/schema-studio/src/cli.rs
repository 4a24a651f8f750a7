//! Command-line arguments.

use clap::{Parser, Subcommand};
use schema_studio_core::{RuleDocs, SessionOptions};
use schema_studio_tool::{DEFAULT_PROGRAM, ToolConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Check and format JSON Schema documents with the `jsonschema` CLI.
#[derive(Parser, Debug)]
#[command(name = "schema-studio", version, about)]
pub struct Cli {
    /// Path to the `jsonschema` executable.
    #[arg(long, global = true, env = "SCHEMA_STUDIO_TOOL", default_value = DEFAULT_PROGRAM)]
    pub tool: PathBuf,

    /// Per-invocation timeout in milliseconds.
    #[arg(long, global = true, env = "SCHEMA_STUDIO_TIMEOUT_MS", default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Base URL that lint rule codes link to.
    #[arg(long, global = true)]
    pub rule_docs: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lint and validate documents, printing diagnostics.
    Check {
        /// Documents to analyze (`.json`, `.yaml`, `.yml`).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the panel state as JSON, one update message per line.
        #[arg(long)]
        json: bool,
    },
    /// Format a document in place.
    Format {
        /// Document to format.
        file: PathBuf,
    },
}

impl Cli {
    pub fn tool_config(&self) -> ToolConfig {
        ToolConfig::default()
            .with_program(&self.tool)
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            extension_version: env!("CARGO_PKG_VERSION").to_string(),
            rule_docs: self
                .rule_docs
                .as_deref()
                .map(RuleDocs::new)
                .unwrap_or_default(),
            // Nothing needs to reload the file between a rewrite and the follow-up check.
            format_settle_delay: Duration::ZERO,
        }
    }
}
