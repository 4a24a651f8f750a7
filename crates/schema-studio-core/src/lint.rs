//! Lint channel: records and output normalization.
//!
//! `jsonschema lint --json` answers with one of three shapes:
//!
//! - a report `{ health, valid, errors: [...] }`
//! - a document parse failure `{ error, line, column, filePath }`
//! - a CLI-level error `{ error, identifier?, line?, column?, filePath? }`
//!
//! [`normalize_lint`] classifies the payload by structural predicates in a fixed order and never
//! fails: unreadable output becomes an error-flagged result with no records.

use crate::diagnostics::{Channel, DiagnosticCode, RuleDocs};
use crate::payload::{
    CliErrorPayload, Shape, lenient_opt_bool, lenient_opt_string, lenient_opt_u32,
    lenient_string, lenient_vec,
};
use crate::position::{SourceSpan, lenient_span};
use crate::record::ErrorRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of the synthetic record emitted when the document is not valid JSON.
pub const JSON_PARSE_ERROR_ID: &str = "json-parse-error";
/// Identifier of the synthetic record for CLI errors without an upstream identifier.
pub const CLI_ERROR_ID: &str = "cli-error";
/// Identifier of the synthetic record for CLI errors that carry an upstream identifier.
pub const CLI_ERROR_WITH_ID: &str = "cli-error-with-id";

/// Identifiers this crate makes up; the rule docs have no page for them.
fn is_synthetic_id(id: &str) -> bool {
    matches!(id, JSON_PARSE_ERROR_ID | CLI_ERROR_ID | CLI_ERROR_WITH_ID)
}

/// A single lint finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintError {
    /// Rule identifier (e.g. `top_level_description`).
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub id: Option<String>,
    /// Short message.
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    /// Longer explanation of the rule.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub description: Option<String>,
    /// Pointer into the document.
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: String,
    /// Pointer into the rule/schema definition.
    #[serde(default, deserialize_with = "lenient_string")]
    pub schema_location: String,
    /// Source span, when the tool could locate the finding.
    #[serde(
        default,
        deserialize_with = "lenient_span",
        skip_serializing_if = "Option::is_none"
    )]
    pub position: Option<SourceSpan>,
}

impl LintError {
    /// Whether this is the synthetic document parse-failure record.
    pub fn is_parse_error(&self) -> bool {
        self.id.as_deref() == Some(JSON_PARSE_ERROR_ID)
    }
}

impl ErrorRecord for LintError {
    const CHANNEL: Channel = Channel::Lint;

    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn document_path(&self) -> &str {
        &self.path
    }

    fn schema_path(&self) -> &str {
        &self.schema_location
    }

    fn position(&self) -> Option<SourceSpan> {
        self.position
    }

    fn code(&self, rule_docs: &RuleDocs) -> Option<DiagnosticCode> {
        let id = self.id.as_deref().filter(|id| !id.is_empty())?;
        if is_synthetic_id(id) {
            return Some(DiagnosticCode::new(id));
        }
        Some(DiagnosticCode::with_target(id, rule_docs.url_for(id)))
    }

    fn annotations(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Description", self.description.as_deref().unwrap_or("")),
            ("Path", &self.path),
            ("Schema Location", &self.schema_location),
        ]
    }
}

/// Normalized lint channel result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LintResult {
    /// Raw tool output (or the failure message when the invocation failed).
    pub raw_output: String,
    /// 0–100 health score, as reported by the tool.
    pub health: Option<u32>,
    /// Overall validity, as reported by the tool.
    pub valid: Option<bool>,
    /// Findings in upstream order.
    pub errors: Vec<LintError>,
    /// Set when the channel itself failed (unreadable output, CLI error, invocation failure).
    pub error: bool,
}

impl LintResult {
    /// A channel-level failure with no findings.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            raw_output: message.into(),
            health: None,
            valid: None,
            errors: Vec::new(),
            error: true,
        }
    }

    /// Whether the document itself could not be parsed.
    pub fn has_parse_error(&self) -> bool {
        self.errors.iter().any(LintError::is_parse_error)
    }
}

#[derive(Debug, Deserialize)]
struct LintReport {
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    health: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_bool")]
    valid: Option<bool>,
    #[serde(default, deserialize_with = "lenient_vec")]
    errors: Vec<LintError>,
}

/// The lint payload shapes, in classification priority order.
#[derive(Debug)]
enum LintPayload {
    DocumentParseFailure {
        message: String,
        line: u32,
        column: u32,
    },
    CliFailure(CliErrorPayload),
    Report(LintReport),
}

impl LintPayload {
    fn classify(value: Value) -> Option<Self> {
        let shape = Shape::of(&value);

        if shape.has_error_message
            && shape.has_line_and_column
            && shape.has_file_path
            && !shape.has_identifier
        {
            let payload: CliErrorPayload = serde_json::from_value(value).ok()?;
            return match (payload.line, payload.column) {
                (Some(line), Some(column)) => Some(Self::DocumentParseFailure {
                    message: payload.error,
                    line,
                    column,
                }),
                _ => Some(Self::CliFailure(payload)),
            };
        }

        if shape.has_error_message && !shape.has_numeric_health && !shape.has_errors_array {
            return serde_json::from_value(value).ok().map(Self::CliFailure);
        }

        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok().map(Self::Report)
    }
}

/// Normalize raw `lint --json` output.
pub fn normalize_lint(output: &str) -> LintResult {
    let raw_output = output.to_string();

    let payload = serde_json::from_str::<Value>(output.trim())
        .ok()
        .and_then(LintPayload::classify);

    match payload {
        None => {
            tracing::debug!("lint output is not a recognized payload");
            LintResult {
                raw_output,
                ..LintResult::failed("")
            }
        }
        Some(LintPayload::DocumentParseFailure {
            message,
            line,
            column,
        }) => LintResult {
            raw_output,
            health: None,
            valid: Some(false),
            errors: vec![LintError {
                id: Some(JSON_PARSE_ERROR_ID.to_string()),
                message,
                description: Some(format!(
                    "Failed to parse JSON document at line {line}, column {column}"
                )),
                path: "/".to_string(),
                schema_location: "/".to_string(),
                position: Some(SourceSpan::point(line, column)),
            }],
            error: false,
        },
        Some(LintPayload::CliFailure(payload)) => LintResult {
            raw_output,
            health: None,
            valid: None,
            errors: vec![cli_error_record(payload)],
            error: true,
        },
        Some(LintPayload::Report(report)) => LintResult {
            raw_output,
            health: report.health,
            valid: report.valid,
            errors: report.errors,
            error: false,
        },
    }
}

fn cli_error_record(payload: CliErrorPayload) -> LintError {
    let position = payload.point();
    let file = payload.file_path.as_deref().unwrap_or("unknown file");
    let mut description = format!("The schema tool reported an error for {file}");
    if let (Some(line), Some(column)) = (payload.line, payload.column) {
        description.push_str(&format!(" at line {line}, column {column}"));
    }
    if let Some(identifier) = &payload.identifier {
        description.push_str(&format!(" ({identifier})"));
    }

    let id = if payload.identifier.is_some() {
        CLI_ERROR_WITH_ID
    } else {
        CLI_ERROR_ID
    };

    LintError {
        id: Some(id.to_string()),
        message: payload.error,
        description: Some(description),
        path: payload.location.unwrap_or_else(|| "/".to_string()),
        schema_location: "/".to_string(),
        position,
    }
}
