//! Diagnostic model, projection, and per-document collections.
//!
//! Normalized records are projected into editor diagnostics here. Each channel has its own
//! [`DiagnosticCollection`]; the host renders those and filters by [`Diagnostic::source`].
//!
//! Collections store each document's set as an `Arc<[Diagnostic]>`. Replacing a set swaps the
//! pointer, so readers holding a previous snapshot keep a complete (old) set and new readers see
//! the complete new one.

use crate::document::DocumentUri;
use crate::position::Range;
use crate::record::ErrorRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Source tag of lint diagnostics.
pub const LINT_SOURCE: &str = "schema-studio (lint)";
/// Source tag of metaschema diagnostics.
pub const METASCHEMA_SOURCE: &str = "schema-studio (metaschema)";

/// Default documentation location for lint rules.
pub const DEFAULT_RULE_DOCS_BASE: &str =
    "https://github.com/sourcemeta/jsonschema/blob/main/docs/lint";

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticSeverity {
    /// Error diagnostics.
    Error,
    /// Warning diagnostics.
    Warning,
    /// Informational diagnostics.
    Information,
    /// Hint diagnostics.
    Hint,
}

/// An independent diagnostic channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    /// Style / best-practice findings.
    Lint,
    /// Validation against the declared metaschema.
    Metaschema,
}

impl Channel {
    /// Severity of every diagnostic on this channel.
    pub fn severity(self) -> DiagnosticSeverity {
        match self {
            Channel::Lint => DiagnosticSeverity::Warning,
            Channel::Metaschema => DiagnosticSeverity::Error,
        }
    }

    /// Source tag of every diagnostic on this channel.
    pub fn source(self) -> &'static str {
        match self {
            Channel::Lint => LINT_SOURCE,
            Channel::Metaschema => METASCHEMA_SOURCE,
        }
    }
}

/// Where lint rule documentation lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDocs {
    base_url: String,
}

impl RuleDocs {
    /// Documentation rooted at `base_url` (one page per rule id).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Documentation URL for a rule id.
    pub fn url_for(&self, rule_id: &str) -> String {
        format!("{}/{}.markdown", self.base_url, rule_id)
    }
}

impl Default for RuleDocs {
    fn default() -> Self {
        Self::new(DEFAULT_RULE_DOCS_BASE)
    }
}

/// A stable diagnostic code, optionally linked to documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticCode {
    /// Code value.
    pub value: String,
    /// Documentation URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl DiagnosticCode {
    /// A code without a documentation link.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            target: None,
        }
    }

    /// A code linked to a documentation URL.
    pub fn with_target(value: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            target: Some(target.into()),
        }
    }
}

/// An annotation attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedInformation {
    /// Document the annotation points into.
    pub uri: DocumentUri,
    /// Range the annotation points at.
    pub range: Range,
    /// `Label: value` text.
    pub message: String,
}

/// A single editor diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Zero-based, half-open range.
    pub range: Range,
    /// Severity (fixed per channel).
    pub severity: DiagnosticSeverity,
    /// Optional stable code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<DiagnosticCode>,
    /// Channel source tag.
    pub source: &'static str,
    /// Message.
    pub message: String,
    /// Non-empty annotations, in display order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<RelatedInformation>,
}

/// Project one channel's records into diagnostics for `uri`.
///
/// Records without a position are dropped; they stay visible in the normalized result.
pub fn project<R: ErrorRecord>(
    uri: &DocumentUri,
    records: &[R],
    rule_docs: &RuleDocs,
) -> Vec<Diagnostic> {
    let channel = R::CHANNEL;
    records
        .iter()
        .filter_map(|record| {
            let range = record.position()?.to_range();
            let related_information = record
                .annotations()
                .into_iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(label, value)| RelatedInformation {
                    uri: uri.clone(),
                    range,
                    message: format!("{label}: {value}"),
                })
                .collect();

            Some(Diagnostic {
                range,
                severity: channel.severity(),
                code: record.code(rule_docs),
                source: channel.source(),
                message: record.message().to_string(),
                related_information,
            })
        })
        .collect()
}

/// Per-document diagnostic sets for one channel.
#[derive(Debug)]
pub struct DiagnosticCollection {
    channel: Channel,
    sets: HashMap<DocumentUri, Arc<[Diagnostic]>>,
}

impl DiagnosticCollection {
    /// Create an empty collection for `channel`.
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            sets: HashMap::new(),
        }
    }

    /// The channel this collection holds.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Replace the document's set. An empty set removes the entry.
    pub fn set(&mut self, uri: DocumentUri, diagnostics: Vec<Diagnostic>) {
        if diagnostics.is_empty() {
            self.sets.remove(&uri);
        } else {
            self.sets.insert(uri, diagnostics.into());
        }
    }

    /// Snapshot of the document's set (empty when none).
    pub fn get(&self, uri: &DocumentUri) -> Arc<[Diagnostic]> {
        self.sets
            .get(uri)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Remove the document's set.
    pub fn delete(&mut self, uri: &DocumentUri) {
        self.sets.remove(uri);
    }

    /// Remove every set.
    pub fn clear(&mut self) {
        self.sets.clear();
    }

    /// Number of documents with at least one diagnostic.
    pub fn document_count(&self) -> usize {
        self.sets.len()
    }

    /// Iterate over `(document, set)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&DocumentUri, &Arc<[Diagnostic]>)> {
        self.sets.iter()
    }
}

/// Both channels' collections.
#[derive(Debug)]
pub struct DiagnosticStore {
    lint: DiagnosticCollection,
    metaschema: DiagnosticCollection,
}

impl DiagnosticStore {
    /// Create empty collections for both channels.
    pub fn new() -> Self {
        Self {
            lint: DiagnosticCollection::new(Channel::Lint),
            metaschema: DiagnosticCollection::new(Channel::Metaschema),
        }
    }

    /// The collection for `channel`.
    pub fn channel(&self, channel: Channel) -> &DiagnosticCollection {
        match channel {
            Channel::Lint => &self.lint,
            Channel::Metaschema => &self.metaschema,
        }
    }

    /// Mutable access to the collection for `channel`.
    pub fn channel_mut(&mut self, channel: Channel) -> &mut DiagnosticCollection {
        match channel {
            Channel::Lint => &mut self.lint,
            Channel::Metaschema => &mut self.metaschema,
        }
    }

    /// Clear one document on both channels.
    pub fn clear_document(&mut self, uri: &DocumentUri) {
        self.lint.delete(uri);
        self.metaschema.delete(uri);
    }

    /// Clear everything.
    pub fn clear(&mut self) {
        self.lint.clear();
        self.metaschema.clear();
    }
}

impl Default for DiagnosticStore {
    fn default() -> Self {
        Self::new()
    }
}
