//! Invocation contract for the external `jsonschema` CLI.
//!
//! The CLI itself is an external collaborator. The panel only depends on the [`SchemaTool`] trait;
//! `schema-studio-tool` provides the process-spawning implementation, and tests use scripted fakes.

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Output of a single tool invocation. Produced once and discarded after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToolResult {
    /// Text written by the tool: stdout, or stderr when stdout is blank.
    pub output: String,
    /// Process exit code.
    pub exit_code: i32,
    /// Set when the process ran but did not terminate normally (e.g. killed by a signal).
    pub invocation_error: Option<String>,
}

impl RawToolResult {
    /// A normally-terminated invocation.
    pub fn new(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code,
            invocation_error: None,
        }
    }

    /// Whether the tool exited with code `0`.
    pub fn succeeded(&self) -> bool {
        self.invocation_error.is_none() && self.exit_code == 0
    }

    /// Promote an abnormal termination into a [`ToolError`].
    pub fn check(self, operation: &'static str) -> Result<Self, ToolError> {
        match self.invocation_error {
            Some(message) => Err(ToolError::Abnormal { operation, message }),
            None => Ok(self),
        }
    }
}

/// `fmt` invocation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatMode {
    /// Report whether the document is formatted, without touching it.
    Check,
    /// Rewrite the document in place.
    Rewrite,
}

/// Failures to run or talk to the external tool.
///
/// Findings and malformed output are never errors; they are normalized into results.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("schema tool not found: {program}")]
    /// The executable could not be located.
    NotFound {
        /// Program that was attempted.
        program: String,
    },

    #[error("failed to run {program}: {source}")]
    /// Spawning the process failed for another reason.
    Spawn {
        /// Program that was attempted.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} timed out after {}ms", .after.as_millis())]
    /// The invocation exceeded the configured timeout.
    TimedOut {
        /// Logical operation (`lint`, `metaschema`, ...).
        operation: &'static str,
        /// Timeout that elapsed.
        after: Duration,
    },

    #[error("{operation} terminated abnormally: {message}")]
    /// The process ran but did not exit normally.
    Abnormal {
        /// Logical operation (`lint`, `metaschema`, ...).
        operation: &'static str,
        /// Description of the termination.
        message: String,
    },

    #[error("I/O error: {0}")]
    /// Communicating with the process failed.
    Io(#[from] std::io::Error),
}

/// The three logical calls the panel makes, plus a version query.
///
/// Implementations are driven from a single-threaded executor, so the returned futures need not be
/// `Send`.
#[allow(async_fn_in_trait)]
pub trait SchemaTool {
    /// `lint --json <path>`.
    async fn lint(&self, path: &Path) -> Result<RawToolResult, ToolError>;

    /// `metaschema --json <path>`. Exit code 1 means a single CLI-level error, 2 means findings.
    async fn metaschema(&self, path: &Path) -> Result<RawToolResult, ToolError>;

    /// `fmt [--check] <path>`.
    async fn format(&self, path: &Path, mode: FormatMode) -> Result<RawToolResult, ToolError>;

    /// The tool's version string.
    async fn version(&self) -> Result<String, ToolError>;
}
