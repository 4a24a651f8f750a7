//! Process adapter configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Executable looked up on `PATH` when none is configured.
pub const DEFAULT_PROGRAM: &str = "jsonschema";

/// Per-invocation timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to locate and run the `jsonschema` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Executable path or name.
    pub program: PathBuf,
    /// Arguments inserted before the subcommand on every invocation.
    pub extra_args: Vec<String>,
    /// Upper bound for a single invocation.
    pub timeout: Duration,
    /// Working directory for the child process (inherits ours when `None`).
    pub working_dir: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            extra_args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            working_dir: None,
        }
    }
}

impl ToolConfig {
    /// Use `program` instead of the default executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Bound each invocation by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Prepend `args` to every invocation.
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ToolConfig::default();
        assert_eq!(config.program, PathBuf::from("jsonschema"));
        assert!(config.extra_args.is_empty());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builders() {
        let config = ToolConfig::default()
            .with_program("/opt/bin/jsonschema")
            .with_timeout(Duration::from_millis(1500))
            .with_extra_args(["--verbose"]);
        assert_eq!(config.program, PathBuf::from("/opt/bin/jsonschema"));
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.extra_args, vec!["--verbose".to_string()]);
    }
}
