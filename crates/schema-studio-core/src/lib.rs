#![warn(missing_docs)]
//! `schema-studio-core` - headless engine for a JSON Schema editor panel.
//!
//! The crate turns the output of the external `jsonschema` CLI into editor diagnostics and a
//! serializable panel view model:
//!
//! - [`normalize_lint`], [`normalize_metaschema`] and [`normalize_format`] classify raw tool
//!   output into typed results, tolerating every malformed payload.
//! - [`map_span`] converts tool spans into zero-based editor ranges.
//! - [`project`] turns error records into [`Diagnostic`]s, and [`DiagnosticStore`] keeps them
//!   per document and channel.
//! - [`PanelSession`] is the panel state machine; [`PanelController`] drives it against a
//!   [`SchemaTool`] implementation.
//!
//! The crate does no process I/O itself; see `schema-studio-tool` for the CLI adapter.

pub mod analysis;
pub mod controller;
pub mod diagnostics;
pub mod document;
pub mod format;
pub mod lint;
pub mod metaschema;
mod payload;
pub mod position;
pub mod protocol;
pub mod record;
pub mod session;
pub mod tool;
pub mod view;

pub use analysis::{AnalysisOutcome, analyze};
pub use controller::{CommandOutput, PanelController};
pub use diagnostics::{
    Channel, DEFAULT_RULE_DOCS_BASE, Diagnostic, DiagnosticCode, DiagnosticCollection,
    DiagnosticSeverity, DiagnosticStore, LINT_SOURCE, METASCHEMA_SOURCE, RelatedInformation,
    RuleDocs, project,
};
pub use document::{
    DocumentUri, ELIGIBLE_EXTENSIONS, FileDescriptor, FocusedEditor, is_eligible,
    percent_encode_path,
};
pub use format::{FormatResult, normalize_format};
pub use lint::{
    CLI_ERROR_ID, CLI_ERROR_WITH_ID, JSON_PARSE_ERROR_ID, LintError, LintResult, normalize_lint,
};
pub use metaschema::{
    EXIT_CLI_ERROR, EXIT_FINDINGS, EXIT_VALID, MetaschemaError, MetaschemaResult,
    normalize_metaschema,
};
pub use position::{Position, Range, SourceSpan, map_span};
pub use protocol::{
    HostAction, HostCommand, IS_WEBVIEW_READY_COMMAND, MessageError, OPEN_PANEL_COMMAND,
    PanelMessage, WebviewMessage,
};
pub use record::ErrorRecord;
pub use session::{
    CycleDisposition, CycleTicket, Dispatch, EditorEvent, FormatDisposition, FormatTicket,
    PanelCallback, PanelSession, SessionOptions,
};
pub use tool::{FormatMode, RawToolResult, SchemaTool, ToolError};
pub use view::{LoadingFlags, PanelPhase, PanelViewState};
