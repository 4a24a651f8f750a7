//! The unified error record shape shared by both channels.
//!
//! Lint and metaschema findings use different field names upstream, but carry the same
//! information. [`ErrorRecord`] is the view the diagnostic projector works against.

use crate::diagnostics::{Channel, DiagnosticCode, RuleDocs};
use crate::position::SourceSpan;

/// A normalized finding from either channel.
pub trait ErrorRecord {
    /// Channel the record belongs to. Determines severity and source tag.
    const CHANNEL: Channel;

    /// Rule id / identifier, if the upstream tool provided one.
    fn identifier(&self) -> Option<&str>;

    /// Primary message.
    fn message(&self) -> &str;

    /// Human-readable description, if any.
    fn description(&self) -> Option<&str>;

    /// JSON-pointer-like path into the document.
    fn document_path(&self) -> &str;

    /// JSON-pointer-like path into the schema or rule definition.
    fn schema_path(&self) -> &str;

    /// Source location, or `None` when the record cannot be anchored.
    fn position(&self) -> Option<SourceSpan>;

    /// Stable diagnostic code for this record.
    fn code(&self, rule_docs: &RuleDocs) -> Option<DiagnosticCode>;

    /// `(label, value)` annotations, in display order. Empty values are filtered by the projector.
    fn annotations(&self) -> Vec<(&'static str, &str)>;
}
