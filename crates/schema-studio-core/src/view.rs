//! The panel's view model.
//!
//! A [`PanelViewState`] is a complete description of what the panel shows. The session builds a
//! new one on every change and pushes it whole; nothing patches it field by field.

use crate::analysis::AnalysisOutcome;
use crate::document::FileDescriptor;
use crate::format::FormatResult;
use crate::lint::LintResult;
use crate::metaschema::MetaschemaResult;
use serde::Serialize;

/// Panel lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PanelPhase {
    /// No eligible document is focused.
    Idle,
    /// A cycle is in flight for the focused document.
    Loading,
    /// The last cycle's results are current.
    Ready,
    /// The invocation pipeline failed.
    Failed,
}

/// Per-operation loading flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFlags {
    /// Lint invocation in flight.
    pub lint: bool,
    /// Format check or rewrite in flight.
    pub format: bool,
    /// Metaschema invocation in flight.
    pub metaschema: bool,
}

impl LoadingFlags {
    /// All flags set to `value`.
    pub fn all(value: bool) -> Self {
        Self {
            lint: value,
            format: value,
            metaschema: value,
        }
    }

    /// Whether any operation is in flight.
    pub fn any(&self) -> bool {
        self.lint || self.format || self.metaschema
    }
}

/// Everything the panel displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelViewState {
    /// Lifecycle phase.
    pub phase: PanelPhase,
    /// The focused eligible document, if any.
    pub file: Option<FileDescriptor>,
    /// Cached `jsonschema` version.
    pub tool_version: Option<String>,
    /// Version of this integration.
    pub extension_version: String,
    /// Lint channel result.
    pub lint_result: Option<LintResult>,
    /// Format result (check, rewrite, or refusal).
    pub format_result: Option<FormatResult>,
    /// Metaschema channel result.
    pub metaschema_result: Option<MetaschemaResult>,
    /// In-flight operations.
    pub loading: LoadingFlags,
    /// Set when the document could not be parsed; formatting is refused while set.
    pub has_unrecoverable_parse_error: bool,
}

impl PanelViewState {
    /// Nothing selected.
    pub fn idle(tool_version: Option<String>, extension_version: String) -> Self {
        Self {
            phase: PanelPhase::Idle,
            file: None,
            tool_version,
            extension_version,
            lint_result: None,
            format_result: None,
            metaschema_result: None,
            loading: LoadingFlags::default(),
            has_unrecoverable_parse_error: false,
        }
    }

    /// A cycle has started for `file`.
    pub fn loading(
        file: FileDescriptor,
        tool_version: Option<String>,
        extension_version: String,
    ) -> Self {
        Self {
            phase: PanelPhase::Loading,
            file: Some(file),
            loading: LoadingFlags::all(true),
            ..Self::idle(tool_version, extension_version)
        }
    }

    /// A cycle completed for `file`.
    pub fn ready(
        file: FileDescriptor,
        outcome: AnalysisOutcome,
        tool_version: Option<String>,
        extension_version: String,
    ) -> Self {
        let has_unrecoverable_parse_error = outcome.has_unrecoverable_parse_error();
        Self {
            phase: PanelPhase::Ready,
            file: Some(file),
            lint_result: Some(outcome.lint),
            format_result: Some(outcome.format),
            metaschema_result: Some(outcome.metaschema),
            has_unrecoverable_parse_error,
            ..Self::idle(tool_version, extension_version)
        }
    }

    /// The invocation pipeline failed for `file`; `message` fills every result slot.
    pub fn failed(
        file: FileDescriptor,
        message: &str,
        tool_version: Option<String>,
        extension_version: String,
    ) -> Self {
        Self {
            phase: PanelPhase::Failed,
            file: Some(file),
            lint_result: Some(LintResult::failed(message)),
            format_result: Some(FormatResult::failed(message)),
            metaschema_result: Some(MetaschemaResult::failed(message)),
            ..Self::idle(tool_version, extension_version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn test_failed_state_repeats_message_in_every_slot() {
        let file = FileDescriptor::eligible(Path::new("/s/a.json")).unwrap();
        let state = PanelViewState::failed(file, "schema tool not found: jsonschema", None, "0.1.0".into());

        assert_eq!(state.phase, PanelPhase::Failed);
        assert_eq!(
            state.lint_result.as_ref().unwrap().raw_output,
            "schema tool not found: jsonschema"
        );
        assert_eq!(
            state.format_result.as_ref().unwrap().raw_output,
            "schema tool not found: jsonschema"
        );
        assert_eq!(
            state.metaschema_result.as_ref().unwrap().raw_output,
            "schema tool not found: jsonschema"
        );
        assert!(!state.loading.any());
        assert!(!state.has_unrecoverable_parse_error);
    }

    #[test]
    fn test_idle_state_serializes_camel_case() {
        let state = PanelViewState::idle(Some("9.3.0".into()), "0.1.0".into());
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({
                "phase": "idle",
                "file": null,
                "toolVersion": "9.3.0",
                "extensionVersion": "0.1.0",
                "lintResult": null,
                "formatResult": null,
                "metaschemaResult": null,
                "loading": { "lint": false, "format": false, "metaschema": false },
                "hasUnrecoverableParseError": false
            })
        );
    }
}
