//! Format channel normalization.

use crate::payload::CliErrorPayload;
use crate::tool::FormatMode;
use serde::Serialize;

/// Normalized result of a `fmt` invocation (check or rewrite).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatResult {
    /// Raw tool output, or the failure/refusal message.
    pub raw_output: String,
    /// Process exit code; `None` when the tool was not run or failed to run.
    pub exit_code: Option<i32>,
    /// Set when formatting failed or was refused.
    pub error: bool,
}

impl FormatResult {
    /// A failed, refused, or never-started format operation.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            raw_output: message.into(),
            exit_code: None,
            error: true,
        }
    }

    /// Whether the document is known to be formatted (check passed or rewrite succeeded).
    pub fn is_formatted(&self) -> bool {
        !self.error && self.exit_code == Some(0)
    }

    /// The message to show the user when this result is an error.
    pub fn error_message(&self) -> Option<String> {
        if !self.error {
            return None;
        }
        let message = CliErrorPayload::parse(&self.raw_output)
            .map(|payload| payload.error)
            .unwrap_or_else(|| self.raw_output.trim().to_string());
        Some(if message.is_empty() {
            "Formatting failed".to_string()
        } else {
            message
        })
    }
}

/// Normalize raw `fmt` output.
///
/// In check mode a non-zero exit only means "not formatted" unless the output is a CLI error
/// object. In rewrite mode any non-zero exit is a failure.
pub fn normalize_format(output: &str, exit_code: i32, mode: FormatMode) -> FormatResult {
    let error = match mode {
        FormatMode::Check => exit_code != 0 && CliErrorPayload::parse(output).is_some(),
        FormatMode::Rewrite => exit_code != 0,
    };

    FormatResult {
        raw_output: output.to_string(),
        exit_code: Some(exit_code),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_mode_distinguishes_unformatted_from_failure() {
        let formatted = normalize_format("", 0, FormatMode::Check);
        assert!(formatted.is_formatted());
        assert_eq!(formatted.error_message(), None);

        let unformatted = normalize_format("fail: /x.json\n", 1, FormatMode::Check);
        assert!(!unformatted.error);
        assert!(!unformatted.is_formatted());

        let broken = normalize_format(
            r#"{"error":"Failed to parse the JSON document","line":2,"column":1,"filePath":"/x.json"}"#,
            1,
            FormatMode::Check,
        );
        assert!(broken.error);
        assert_eq!(
            broken.error_message().as_deref(),
            Some("Failed to parse the JSON document")
        );
    }

    #[test]
    fn test_rewrite_failure_uses_plain_output() {
        let result = normalize_format("  permission denied\n", 1, FormatMode::Rewrite);
        assert!(result.error);
        assert_eq!(result.error_message().as_deref(), Some("permission denied"));

        let silent = normalize_format("", 3, FormatMode::Rewrite);
        assert_eq!(silent.error_message().as_deref(), Some("Formatting failed"));
    }
}
