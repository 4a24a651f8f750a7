//! Loosely-typed upstream JSON shapes.
//!
//! The CLI emits several ad-hoc objects that differ only by which fields are present. The helpers
//! here read them without ever failing on a wrong-typed optional field: such a field is treated as
//! absent.

use crate::position::SourceSpan;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Structural predicates over a parsed payload, evaluated once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shape {
    pub has_error_message: bool,
    pub has_identifier: bool,
    pub has_line_and_column: bool,
    pub has_file_path: bool,
    pub has_numeric_health: bool,
    pub has_errors_array: bool,
}

impl Shape {
    pub fn of(value: &Value) -> Self {
        let field = |name: &str| value.get(name).filter(|v| !v.is_null());
        Self {
            has_error_message: field("error").is_some_and(Value::is_string),
            has_identifier: field("identifier").is_some(),
            has_line_and_column: field("line").is_some_and(Value::is_number)
                && field("column").is_some_and(Value::is_number),
            has_file_path: field("filePath").is_some_and(Value::is_string),
            has_numeric_health: field("health").is_some_and(Value::is_number),
            has_errors_array: field("errors").is_some_and(Value::is_array),
        }
    }
}

/// A CLI-level error object: `{ error, identifier?, location?, line?, column?, filePath? }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CliErrorPayload {
    pub error: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub identifier: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub line: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub column: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub file_path: Option<String>,
}

impl CliErrorPayload {
    /// Parse a CLI error object from raw tool output.
    pub fn parse(output: &str) -> Option<Self> {
        serde_json::from_str(output.trim()).ok()
    }

    /// The `{ error, line, column, filePath }` shape the tool emits for an unparsable document.
    pub fn is_document_parse_failure(&self) -> bool {
        self.identifier.is_none()
            && self.line.is_some()
            && self.column.is_some()
            && self.file_path.is_some()
    }

    /// Point span at `(line, column)` when both are known.
    pub fn point(&self) -> Option<SourceSpan> {
        Some(SourceSpan::point(self.line?, self.column?))
    }
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

pub(crate) fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

pub(crate) fn lenient_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok()))
}

pub(crate) fn lenient_opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_bool))
}

/// Deserialize an array leniently: non-arrays become empty, entries that do not deserialize are
/// skipped.
pub(crate) fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if parsed.len() != total {
        tracing::warn!(
            skipped = total - parsed.len(),
            "dropping malformed entries from tool payload"
        );
    }
    Ok(parsed)
}
