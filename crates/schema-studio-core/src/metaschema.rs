//! Metaschema channel: records and output normalization.
//!
//! The exit code of `jsonschema metaschema --json` selects the payload shape:
//!
//! | exit | meaning | payload |
//! |---|---|---|
//! | 0 | valid | ignored |
//! | 1 | one CLI-level/structural error | `{ error, location?, identifier?, line?, column? }` |
//! | 2 | itemized findings | `{ errors: [...] }` |
//!
//! Anything else, or an unreadable payload on 1/2, leaves `errors` absent.

use crate::diagnostics::{Channel, DiagnosticCode, RuleDocs};
use crate::payload::{CliErrorPayload, lenient_opt_string};
use crate::position::{SourceSpan, lenient_span};
use crate::record::ErrorRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Exit code for a valid document.
pub const EXIT_VALID: i32 = 0;
/// Exit code for a single CLI-level error.
pub const EXIT_CLI_ERROR: i32 = 1;
/// Exit code for itemized validation findings.
pub const EXIT_FINDINGS: i32 = 2;

const DEFAULT_MESSAGE: &str = "Validation error";

/// A single metaschema finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaschemaError {
    /// Error message.
    pub error: String,
    /// Pointer into the document.
    pub instance_location: String,
    /// Evaluation path of the failing keyword.
    pub keyword_location: String,
    /// Absolute URI of the failing keyword, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    /// Source span of the failing instance, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_position: Option<SourceSpan>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaschemaEntry {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    error: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    instance_location: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    keyword_location: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    absolute_keyword_location: Option<String>,
    #[serde(default, deserialize_with = "lenient_span")]
    instance_position: Option<SourceSpan>,
}

impl From<MetaschemaEntry> for MetaschemaError {
    fn from(entry: MetaschemaEntry) -> Self {
        Self {
            error: entry.error.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            instance_location: entry.instance_location.unwrap_or_default(),
            keyword_location: entry.keyword_location.unwrap_or_default(),
            absolute_keyword_location: entry.absolute_keyword_location,
            instance_position: entry.instance_position,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FindingsPayload {
    errors: Vec<Value>,
}

impl FindingsPayload {
    fn into_records(self) -> Vec<MetaschemaError> {
        let total = self.errors.len();
        let records: Vec<MetaschemaError> = self
            .errors
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<MetaschemaEntry>(entry).ok())
            .map(MetaschemaError::from)
            .collect();
        if records.len() != total {
            tracing::warn!(
                skipped = total - records.len(),
                "dropping non-object metaschema entries"
            );
        }
        records
    }
}

impl ErrorRecord for MetaschemaError {
    const CHANNEL: Channel = Channel::Metaschema;

    fn identifier(&self) -> Option<&str> {
        self.absolute_keyword_location.as_deref()
    }

    fn message(&self) -> &str {
        &self.error
    }

    fn description(&self) -> Option<&str> {
        None
    }

    fn document_path(&self) -> &str {
        &self.instance_location
    }

    fn schema_path(&self) -> &str {
        &self.keyword_location
    }

    fn position(&self) -> Option<SourceSpan> {
        self.instance_position
    }

    fn code(&self, _rule_docs: &RuleDocs) -> Option<DiagnosticCode> {
        Some(DiagnosticCode::new(self.instance_location.clone()))
    }

    fn annotations(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Instance Location", &self.instance_location),
            ("Keyword Location", &self.keyword_location),
            (
                "Absolute Keyword Location",
                self.absolute_keyword_location.as_deref().unwrap_or(""),
            ),
        ]
    }
}

/// Normalized metaschema channel result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaschemaResult {
    /// Raw tool output (or the failure message when the invocation failed).
    pub raw_output: String,
    /// Process exit code; `None` when the invocation itself failed.
    pub exit_code: Option<i32>,
    /// Findings, or `None` when the output could not be interpreted.
    pub errors: Option<Vec<MetaschemaError>>,
}

impl MetaschemaResult {
    /// A failed invocation.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            raw_output: message.into(),
            exit_code: None,
            errors: None,
        }
    }

    /// Findings as a slice (empty when absent).
    pub fn findings(&self) -> &[MetaschemaError] {
        self.errors.as_deref().unwrap_or(&[])
    }

    /// The tool exited non-zero but nothing interpretable came back.
    ///
    /// This is how a document the validator could not even parse shows up on this channel.
    pub fn has_parse_error(&self) -> bool {
        matches!(self.exit_code, Some(code) if code != EXIT_VALID) && self.errors.is_none()
    }
}

/// Normalize raw `metaschema --json` output given its exit code.
pub fn normalize_metaschema(output: &str, exit_code: i32) -> MetaschemaResult {
    let errors = match exit_code {
        // A document parse failure is reported once, on the lint channel.
        EXIT_CLI_ERROR => CliErrorPayload::parse(output)
            .filter(|payload| !payload.is_document_parse_failure())
            .map(|payload| vec![cli_error_record(payload)]),
        EXIT_FINDINGS => serde_json::from_str::<FindingsPayload>(output.trim())
            .ok()
            .map(FindingsPayload::into_records),
        _ => None,
    };

    if errors.is_none() && exit_code != EXIT_VALID {
        tracing::debug!(exit_code, "metaschema output could not be interpreted");
    }

    MetaschemaResult {
        raw_output: output.to_string(),
        exit_code: Some(exit_code),
        errors,
    }
}

fn cli_error_record(payload: CliErrorPayload) -> MetaschemaError {
    let instance_position = payload.point();
    MetaschemaError {
        error: payload.error,
        instance_location: payload.location.unwrap_or_else(|| "/".to_string()),
        keyword_location: "/".to_string(),
        absolute_keyword_location: payload.identifier,
        instance_position,
    }
}
