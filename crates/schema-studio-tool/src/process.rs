//! [`SchemaTool`] backed by the `jsonschema` executable.

use crate::config::ToolConfig;
use schema_studio_core::{FormatMode, RawToolResult, SchemaTool, ToolError};
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use tokio::process::Command;

/// Runs one child process per invocation.
#[derive(Debug, Clone, Default)]
pub struct ProcessTool {
    config: ToolConfig,
}

impl ProcessTool {
    /// Create an adapter for `config`.
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    /// The adapter's configuration.
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    async fn invoke(
        &self,
        operation: &'static str,
        args: &[&OsStr],
    ) -> Result<RawToolResult, ToolError> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.extra_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(
            operation,
            program = %self.config.program.display(),
            "spawning schema tool"
        );
        let child = cmd.spawn().map_err(|err| self.spawn_error(err))?;

        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                tracing::warn!(
                    operation,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "schema tool timed out"
                );
                ToolError::TimedOut {
                    operation,
                    after: self.config.timeout,
                }
            })??;

        let result = raw_result(&output);
        tracing::debug!(
            operation,
            exit_code = result.exit_code,
            bytes = result.output.len(),
            "schema tool exited"
        );
        Ok(result)
    }

    fn spawn_error(&self, err: io::Error) -> ToolError {
        let program = self.config.program.display().to_string();
        if err.kind() == io::ErrorKind::NotFound {
            ToolError::NotFound { program }
        } else {
            ToolError::Spawn {
                program,
                source: err,
            }
        }
    }
}

impl SchemaTool for ProcessTool {
    async fn lint(&self, path: &Path) -> Result<RawToolResult, ToolError> {
        self.invoke("lint", &[OsStr::new("lint"), OsStr::new("--json"), path.as_os_str()])
            .await
    }

    async fn metaschema(&self, path: &Path) -> Result<RawToolResult, ToolError> {
        self.invoke(
            "metaschema",
            &[OsStr::new("metaschema"), OsStr::new("--json"), path.as_os_str()],
        )
        .await
    }

    async fn format(&self, path: &Path, mode: FormatMode) -> Result<RawToolResult, ToolError> {
        match mode {
            FormatMode::Check => {
                self.invoke(
                    "format",
                    &[OsStr::new("fmt"), OsStr::new("--check"), path.as_os_str()],
                )
                .await
            }
            FormatMode::Rewrite => {
                self.invoke("format", &[OsStr::new("fmt"), path.as_os_str()])
                    .await
            }
        }
    }

    async fn version(&self) -> Result<String, ToolError> {
        let result = self
            .invoke("version", &[OsStr::new("version")])
            .await?
            .check("version")?;
        if !result.succeeded() {
            return Err(ToolError::Abnormal {
                operation: "version",
                message: format!("exited with code {}", result.exit_code),
            });
        }
        Ok(result.output.trim().to_string())
    }
}

/// Fold a finished process into a [`RawToolResult`].
///
/// Stdout carries the payload. Stderr only stands in for it when stdout is blank, so warnings on
/// stderr never end up inside the JSON.
fn raw_result(output: &Output) -> RawToolResult {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stdout.trim().is_empty() {
        stderr.into_owned()
    } else {
        if !stderr.trim().is_empty() {
            tracing::debug!(stderr = %stderr.trim_end(), "schema tool wrote to stderr");
        }
        stdout.into_owned()
    };

    match output.status.code() {
        Some(code) => RawToolResult::new(text, code),
        None => RawToolResult {
            output: text,
            exit_code: -1,
            invocation_error: Some(describe_abnormal_exit(output.status)),
        },
    }
}

#[cfg(unix)]
fn describe_abnormal_exit(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("killed by signal {signal}"),
        None => "terminated without an exit code".to_string(),
    }
}

#[cfg(not(unix))]
fn describe_abnormal_exit(_status: ExitStatus) -> String {
    "terminated without an exit code".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn output(stdout: &str, stderr: &str, code: i32) -> Output {
        use std::os::unix::process::ExitStatusExt;
        Output {
            status: ExitStatus::from_raw(code << 8),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_is_the_payload() {
        let result = raw_result(&output("{\"valid\":true}", "warning: slow\n", 0));
        assert_eq!(result.output, "{\"valid\":true}");
        assert_eq!(result.exit_code, 0);

        let result = raw_result(&output("\n", "boom", 1));
        assert_eq!(result.output, "boom");
        assert_eq!(result.exit_code, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_is_an_invocation_error() {
        use std::os::unix::process::ExitStatusExt;
        let killed = Output {
            status: ExitStatus::from_raw(9),
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let result = raw_result(&killed);
        assert_eq!(result.invocation_error.as_deref(), Some("killed by signal 9"));
        assert!(result.check("lint").is_err());
    }

    #[test]
    fn test_missing_program_maps_to_not_found() {
        let tool = ProcessTool::new(ToolConfig::default().with_program("/nonexistent/jsonschema"));
        let err = tool.spawn_error(io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(
            err,
            ToolError::NotFound { ref program } if program == "/nonexistent/jsonschema"
        ));

        let err = tool.spawn_error(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
