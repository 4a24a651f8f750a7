//! One analysis cycle: lint, metaschema, and format-check for a single document.

use crate::format::{FormatResult, normalize_format};
use crate::lint::{LintResult, normalize_lint};
use crate::metaschema::{MetaschemaResult, normalize_metaschema};
use crate::tool::{FormatMode, RawToolResult, SchemaTool, ToolError};
use std::path::Path;

/// The normalized results of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    /// Lint channel.
    pub lint: LintResult,
    /// Metaschema channel.
    pub metaschema: MetaschemaResult,
    /// Format check.
    pub format: FormatResult,
}

impl AnalysisOutcome {
    /// Normalize the three raw invocation results.
    pub fn from_raw(lint: &RawToolResult, metaschema: &RawToolResult, format: &RawToolResult) -> Self {
        Self {
            lint: normalize_lint(&lint.output),
            metaschema: normalize_metaschema(&metaschema.output, metaschema.exit_code),
            format: normalize_format(&format.output, format.exit_code, FormatMode::Check),
        }
    }

    /// Whether either channel signals that the document could not be parsed.
    pub fn has_unrecoverable_parse_error(&self) -> bool {
        self.lint.has_parse_error() || self.metaschema.has_parse_error()
    }
}

/// Run the three invocations concurrently and normalize them.
///
/// All three are awaited even if one fails, so no invocation is left dangling; the first failure
/// (in lint, metaschema, format order) is returned.
pub async fn analyze<T: SchemaTool>(tool: &T, path: &Path) -> Result<AnalysisOutcome, ToolError> {
    let (lint, metaschema, format) = tokio::join!(
        tool.lint(path),
        tool.metaschema(path),
        tool.format(path, FormatMode::Check),
    );

    let lint = lint?.check("lint")?;
    let metaschema = metaschema?.check("metaschema")?;
    let format = format?.check("format")?;

    Ok(AnalysisOutcome::from_raw(&lint, &metaschema, &format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_flag_from_either_channel() {
        let clean = AnalysisOutcome::from_raw(
            &RawToolResult::new(r#"{"health":100,"valid":true,"errors":[]}"#, 0),
            &RawToolResult::new("", 0),
            &RawToolResult::new("", 0),
        );
        assert!(!clean.has_unrecoverable_parse_error());

        let lint_parse = AnalysisOutcome::from_raw(
            &RawToolResult::new(
                r#"{"error":"Unexpected token","line":1,"column":2,"filePath":"/x.json"}"#,
                1,
            ),
            &RawToolResult::new("", 0),
            &RawToolResult::new("", 0),
        );
        assert!(lint_parse.has_unrecoverable_parse_error());

        let metaschema_parse = AnalysisOutcome::from_raw(
            &RawToolResult::new(r#"{"health":100,"valid":true,"errors":[]}"#, 0),
            &RawToolResult::new("unexpected end of input", 1),
            &RawToolResult::new("", 0),
        );
        assert!(metaschema_parse.has_unrecoverable_parse_error());
    }
}
