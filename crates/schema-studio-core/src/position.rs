//! Tool span → editor range mapping.
//!
//! The `jsonschema` CLI reports locations as `[startLine, startColumn, endLine, endColumn]`, all
//! 1-based with an inclusive end column. Editors want zero-based, half-open ranges. This module
//! owns that conversion, including the root clamp applied to whole-document spans.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A location reported by the upstream tool (1-based, inclusive end column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct SourceSpan {
    /// First line (1-based).
    pub start_line: u32,
    /// First column (1-based).
    pub start_column: u32,
    /// Last line (1-based).
    pub end_line: u32,
    /// Last column (1-based, inclusive).
    pub end_column: u32,
}

impl SourceSpan {
    /// Create a span from its four components.
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// A zero-width span anchored at a single `(line, column)` point.
    pub fn point(line: u32, column: u32) -> Self {
        Self::new(line, column, line, column)
    }

    /// Whether the span starts at the very first character of the document.
    pub fn starts_at_origin(&self) -> bool {
        self.start_line == 1 && self.start_column == 1
    }

    /// Whether the end lies strictly after the start.
    pub fn is_non_trivial(&self) -> bool {
        (self.end_line, self.end_column) > (self.start_line, self.start_column)
    }

    /// Whether this span refers to the document as a whole.
    ///
    /// Root-level structural errors are reported from `(1,1)` to the end of the file.
    pub fn is_root_level(&self) -> bool {
        self.starts_at_origin() && self.is_non_trivial()
    }

    /// Map this span into an editor range. See [`map_span`].
    pub fn to_range(&self) -> Range {
        map_span(self)
    }
}

impl From<[u32; 4]> for SourceSpan {
    fn from(value: [u32; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<SourceSpan> for [u32; 4] {
    fn from(span: SourceSpan) -> Self {
        [
            span.start_line,
            span.start_column,
            span.end_line,
            span.end_column,
        ]
    }
}

/// Editor position (0-based line and character).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-based).
    pub line: u32,
    /// Character offset within the line (0-based).
    pub character: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Editor range (half-open: `start` inclusive, `end` exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Range start position (inclusive).
    pub start: Position,
    /// Range end position (exclusive).
    pub end: Position,
}

impl Range {
    /// Create a new range.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// The zero-width range at the top of the document.
    pub fn origin() -> Self {
        Self::new(Position::new(0, 0), Position::new(0, 0))
    }

    /// Whether `start == end`.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Convert a tool span into a zero-based, half-open editor range.
///
/// Root-level spans (starting at `(1,1)` and extending past it) collapse to `(0,0)-(0,0)`; a
/// whole-document highlight is unreadable. Everything else maps as
/// `(startLine-1, startCol-1)..(endLine-1, endCol)`.
pub fn map_span(span: &SourceSpan) -> Range {
    if span.is_root_level() {
        return Range::origin();
    }

    Range::new(
        Position::new(
            span.start_line.saturating_sub(1),
            span.start_column.saturating_sub(1),
        ),
        Position::new(span.end_line.saturating_sub(1), span.end_column),
    )
}

/// Read an optional span, treating anything that is not four non-negative integers as absent.
///
/// Upstream payloads are loosely structured; a malformed position must make a record unmappable,
/// not make the whole payload unreadable.
pub(crate) fn lenient_span<'de, D>(deserializer: D) -> Result<Option<SourceSpan>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(span_from_value))
}

pub(crate) fn span_from_value(value: &Value) -> Option<SourceSpan> {
    let items = value.as_array()?;
    if items.len() != 4 {
        return None;
    }
    let mut parts = [0u32; 4];
    for (slot, item) in parts.iter_mut().zip(items) {
        *slot = u32::try_from(item.as_u64()?).ok()?;
    }
    Some(SourceSpan::from(parts))
}
