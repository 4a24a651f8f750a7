//! Panel session state machine.
//!
//! A [`PanelSession`] owns everything the panel needs while it is open: the authoritative
//! [`PanelViewState`], the per-document diagnostic collections, and the bookkeeping that decides
//! whether a finished analysis cycle is still relevant.
//!
//! # Lifecycle
//!
//! ```text
//!            focus/save/open (eligible)              all three invocations done
//!   Idle ───────────────────────────────▶ Loading ──────────────────────────────▶ Ready
//!    ▲                                      │  ▲                                    │
//!    │ ineligible / non-file focus          │  └──────── focus/save ────────────────┤
//!    └──────────────────────────────────────┴──▶ Failed (invocation error) ◀────────┘
//! ```
//!
//! # Fencing
//!
//! Each cycle gets a sequence number, and the session remembers the latest number started per
//! document. A completion whose number is not the latest for its document is dropped entirely, so
//! a slow cycle can never overwrite fresher diagnostics or a fresher view.
//!
//! The session does no I/O. It hands out [`CycleTicket`]s and [`FormatTicket`]s, and the caller
//! (usually [`crate::PanelController`]) runs the tool and reports back.

use crate::analysis::AnalysisOutcome;
use crate::diagnostics::{Channel, DiagnosticStore, RuleDocs, project};
use crate::document::{DocumentUri, FileDescriptor, FocusedEditor};
use crate::format::{FormatResult, normalize_format};
use crate::protocol::{HostAction, PanelMessage, WebviewMessage, is_external_link};
use crate::tool::{FormatMode, RawToolResult, ToolError};
use crate::view::{PanelPhase, PanelViewState};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Callback invoked with every view update pushed to the display surface.
pub type PanelCallback = Box<dyn FnMut(&PanelMessage)>;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Version of this integration, shown in the panel.
    pub extension_version: String,
    /// Where lint rule codes link to.
    pub rule_docs: RuleDocs,
    /// Pause between a format rewrite and the follow-up analysis, so the host can reload the file.
    pub format_settle_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            extension_version: env!("CARGO_PKG_VERSION").to_string(),
            rule_docs: RuleDocs::default(),
            format_settle_delay: Duration::from_millis(250),
        }
    }
}

/// Document events reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// The panel was opened (or revealed) with this editor focused.
    PanelOpened {
        /// Focused editor, if any.
        focused: Option<FocusedEditor>,
    },
    /// The focused editor changed. `None` means no text editor has focus (e.g. the panel itself).
    FocusChanged(Option<FocusedEditor>),
    /// A document was saved.
    DocumentSaved(PathBuf),
    /// A document was closed.
    DocumentClosed(PathBuf),
}

/// Permission to run one analysis cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleTicket {
    file: FileDescriptor,
    sequence: u64,
}

impl CycleTicket {
    /// The document to analyze.
    pub fn file(&self) -> &FileDescriptor {
        &self.file
    }

    /// Path of the document to analyze.
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Identity of the document.
    pub fn uri(&self) -> &DocumentUri {
        &self.file.uri
    }

    /// Sequence number of this cycle.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// What happened to a completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDisposition {
    /// Diagnostics and the displayed state were updated.
    Displayed,
    /// Diagnostics were updated; focus had moved on, so the view was left alone.
    Background,
    /// A newer cycle for the same document had started; the result was dropped.
    Stale,
}

/// Permission to rewrite one document with the formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTicket {
    file: FileDescriptor,
}

impl FormatTicket {
    /// Path of the document to format.
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Identity of the document.
    pub fn uri(&self) -> &DocumentUri {
        &self.file.uri
    }
}

/// Outcome of a format rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatDisposition {
    /// The document was rewritten; it should be re-analyzed.
    Formatted,
    /// Formatting failed; the message should be shown to the user.
    Failed {
        /// Notification text.
        message: String,
    },
}

/// Result of dispatching a webview message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The host should perform this action.
    Host(HostAction),
    /// The caller should run the formatter and report via [`PanelSession::complete_format`].
    Format(FormatTicket),
}

/// The panel's owned state.
pub struct PanelSession {
    options: SessionOptions,
    view: PanelViewState,
    focused: Option<FileDescriptor>,
    latest: HashMap<DocumentUri, u64>,
    next_sequence: u64,
    unparsable: HashSet<DocumentUri>,
    formatting: Option<DocumentUri>,
    diagnostics: DiagnosticStore,
    tool_version: Option<String>,
    webview_ready: bool,
    subscribers: Vec<PanelCallback>,
}

impl PanelSession {
    /// Create an idle session.
    pub fn new(options: SessionOptions) -> Self {
        let view = PanelViewState::idle(None, options.extension_version.clone());
        Self {
            options,
            view,
            focused: None,
            latest: HashMap::new(),
            next_sequence: 0,
            unparsable: HashSet::new(),
            formatting: None,
            diagnostics: DiagnosticStore::new(),
            tool_version: None,
            webview_ready: false,
            subscribers: Vec::new(),
        }
    }

    /// Session configuration.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The authoritative view state.
    pub fn view(&self) -> &PanelViewState {
        &self.view
    }

    /// Current phase.
    pub fn phase(&self) -> PanelPhase {
        self.view.phase
    }

    /// The focused eligible document.
    pub fn focused(&self) -> Option<&FileDescriptor> {
        self.focused.as_ref()
    }

    /// Diagnostics for every analyzed document.
    pub fn diagnostics(&self) -> &DiagnosticStore {
        &self.diagnostics
    }

    /// Whether the webview has signalled readiness.
    pub fn is_webview_ready(&self) -> bool {
        self.webview_ready
    }

    /// Cached tool version.
    pub fn tool_version(&self) -> Option<&str> {
        self.tool_version.as_deref()
    }

    /// Cache the tool version; it appears in the next pushed state.
    pub fn set_tool_version(&mut self, version: Option<String>) {
        self.tool_version = version;
    }

    /// Register a display callback.
    ///
    /// Callbacks run while the session is mutably borrowed and must not call back into it.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&PanelMessage) + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    /// React to a host event. Returns a ticket when a new cycle must run.
    pub fn handle_event(&mut self, event: EditorEvent) -> Option<CycleTicket> {
        match event {
            EditorEvent::PanelOpened { focused } => self.focus(focused, true),
            EditorEvent::FocusChanged(focused) => self.focus(focused, false),
            EditorEvent::DocumentSaved(path) => {
                let uri = DocumentUri::from_path(&path);
                match self.focused.clone() {
                    Some(file) if file.uri == uri => Some(self.begin_cycle(file)),
                    _ => {
                        tracing::debug!(%uri, "ignoring save of unfocused document");
                        None
                    }
                }
            }
            EditorEvent::DocumentClosed(path) => {
                let uri = DocumentUri::from_path(&path);
                self.diagnostics.clear_document(&uri);
                self.latest.remove(&uri);
                self.unparsable.remove(&uri);
                if self.focused.as_ref().is_some_and(|file| file.uri == uri) {
                    self.go_idle();
                }
                None
            }
        }
    }

    /// Start a new cycle for `uri` if it is still the focused document.
    pub fn refresh(&mut self, uri: &DocumentUri) -> Option<CycleTicket> {
        let file = self.focused.clone().filter(|file| &file.uri == uri)?;
        Some(self.begin_cycle(file))
    }

    /// Apply a finished cycle.
    pub fn complete_cycle(
        &mut self,
        ticket: CycleTicket,
        result: Result<AnalysisOutcome, ToolError>,
    ) -> CycleDisposition {
        let CycleTicket { file, sequence } = ticket;

        if self.latest.get(&file.uri) != Some(&sequence) {
            tracing::debug!(uri = %file.uri, sequence, "discarding stale analysis cycle");
            return CycleDisposition::Stale;
        }

        let displayed = self.focused.as_ref().is_some_and(|f| f.uri == file.uri);

        match result {
            Ok(outcome) => {
                let lint = project(&file.uri, &outcome.lint.errors, &self.options.rule_docs);
                let metaschema = project(
                    &file.uri,
                    outcome.metaschema.findings(),
                    &self.options.rule_docs,
                );
                tracing::info!(
                    uri = %file.uri,
                    sequence,
                    lint = lint.len(),
                    metaschema = metaschema.len(),
                    "analysis cycle complete"
                );
                self.diagnostics
                    .channel_mut(Channel::Lint)
                    .set(file.uri.clone(), lint);
                self.diagnostics
                    .channel_mut(Channel::Metaschema)
                    .set(file.uri.clone(), metaschema);

                if outcome.has_unrecoverable_parse_error() {
                    self.unparsable.insert(file.uri.clone());
                } else {
                    self.unparsable.remove(&file.uri);
                }

                if displayed {
                    let view = PanelViewState::ready(
                        file,
                        outcome,
                        self.tool_version.clone(),
                        self.options.extension_version.clone(),
                    );
                    self.show_completed(view);
                }
            }
            Err(err) => {
                tracing::warn!(uri = %file.uri, sequence, error = %err, "analysis cycle failed");
                if displayed {
                    let view = PanelViewState::failed(
                        file,
                        &err.to_string(),
                        self.tool_version.clone(),
                        self.options.extension_version.clone(),
                    );
                    self.show_completed(view);
                }
            }
        }

        if displayed {
            CycleDisposition::Displayed
        } else {
            CycleDisposition::Background
        }
    }

    /// Ask to format the focused document.
    ///
    /// Refused (with the refusal recorded in the format slot) when nothing is focused or the
    /// last completed cycle for the document found it unparsable. A cycle in flight does not
    /// clear that verdict.
    pub fn begin_format(&mut self) -> Result<FormatTicket, String> {
        let Some(file) = self.focused.clone() else {
            return Err("No schema document is selected".to_string());
        };

        if self.view.has_unrecoverable_parse_error || self.unparsable.contains(&file.uri) {
            let message = format!(
                "Cannot format {}: the document could not be parsed. Fix the parse errors first.",
                file.file_name
            );
            tracing::warn!(uri = %file.uri, "refusing to format unparsable document");
            self.record_format(FormatResult::failed(message.clone()));
            return Err(message);
        }

        self.formatting = Some(file.uri.clone());
        let mut view = self.view.clone();
        view.loading.format = true;
        self.set_view(view);
        Ok(FormatTicket { file })
    }

    /// Record the result of a format rewrite.
    pub fn complete_format(
        &mut self,
        ticket: &FormatTicket,
        result: Result<RawToolResult, ToolError>,
    ) -> FormatDisposition {
        let result = match result {
            Ok(raw) => normalize_format(&raw.output, raw.exit_code, FormatMode::Rewrite),
            Err(err) => FormatResult::failed(err.to_string()),
        };
        let message = result.error_message();

        if self.formatting.as_ref() == Some(&ticket.file.uri) {
            self.formatting = None;
        }
        if self.focused.as_ref().is_some_and(|f| f.uri == ticket.file.uri) {
            self.record_format(result);
        }

        match message {
            Some(message) => {
                tracing::warn!(uri = %ticket.file.uri, %message, "formatting failed");
                FormatDisposition::Failed { message }
            }
            None => FormatDisposition::Formatted,
        }
    }

    /// Handle a message posted by the webview.
    pub fn dispatch(&mut self, message: WebviewMessage) -> Dispatch {
        match message {
            WebviewMessage::Ready => {
                self.webview_ready = true;
                self.publish();
                Dispatch::Host(HostAction::None)
            }
            WebviewMessage::GoToPosition { position } => match &self.focused {
                Some(file) => Dispatch::Host(HostAction::RevealRange {
                    uri: file.uri.clone(),
                    range: position.to_range(),
                }),
                None => Dispatch::Host(HostAction::None),
            },
            WebviewMessage::OpenExternal { url } => {
                if is_external_link(&url) {
                    Dispatch::Host(HostAction::OpenExternal { url })
                } else {
                    tracing::warn!(%url, "refusing to open non-http link");
                    Dispatch::Host(HostAction::None)
                }
            }
            WebviewMessage::FormatSchema => match self.begin_format() {
                Ok(ticket) => Dispatch::Format(ticket),
                Err(message) => Dispatch::Host(HostAction::ShowError { message }),
            },
        }
    }

    /// Tear the session down: diagnostics cleared, subscribers dropped.
    pub fn dispose(&mut self) {
        self.diagnostics.clear();
        self.latest.clear();
        self.unparsable.clear();
        self.formatting = None;
        self.focused = None;
        self.subscribers.clear();
        self.webview_ready = false;
        self.view = PanelViewState::idle(
            self.tool_version.clone(),
            self.options.extension_version.clone(),
        );
    }

    fn focus(&mut self, focused: Option<FocusedEditor>, opening: bool) -> Option<CycleTicket> {
        let path = match focused {
            None if opening => {
                self.go_idle();
                return None;
            }
            None => return None,
            Some(FocusedEditor::Virtual) => {
                self.go_idle();
                return None;
            }
            Some(FocusedEditor::File(path)) => path,
        };

        let Some(file) = FileDescriptor::eligible(&path) else {
            tracing::debug!(path = %path.display(), "focused file is not a schema document");
            self.go_idle();
            return None;
        };

        let unchanged = self.view.phase != PanelPhase::Idle
            && self.focused.as_ref().is_some_and(|f| f.uri == file.uri);
        if unchanged && !opening {
            return None;
        }

        Some(self.begin_cycle(file))
    }

    fn begin_cycle(&mut self, file: FileDescriptor) -> CycleTicket {
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        self.latest.insert(file.uri.clone(), sequence);
        self.focused = Some(file.clone());

        tracing::debug!(uri = %file.uri, sequence, "starting analysis cycle");
        let view = PanelViewState::loading(
            file.clone(),
            self.tool_version.clone(),
            self.options.extension_version.clone(),
        );
        self.set_view(view);

        CycleTicket { file, sequence }
    }

    /// Replace the view with a completed cycle's, keeping a rewrite in flight visible.
    fn show_completed(&mut self, mut view: PanelViewState) {
        view.loading.format = view
            .file
            .as_ref()
            .is_some_and(|file| self.formatting.as_ref() == Some(&file.uri));
        self.set_view(view);
    }

    fn go_idle(&mut self) {
        self.focused = None;
        let view = PanelViewState::idle(
            self.tool_version.clone(),
            self.options.extension_version.clone(),
        );
        self.set_view(view);
    }

    fn record_format(&mut self, result: FormatResult) {
        let mut view = self.view.clone();
        view.format_result = Some(result);
        view.loading.format = false;
        self.set_view(view);
    }

    fn set_view(&mut self, view: PanelViewState) {
        if view == self.view {
            return;
        }
        self.view = view;
        self.publish();
    }

    fn publish(&mut self) {
        if !self.webview_ready {
            return;
        }
        let message = PanelMessage::Update {
            state: self.view.clone(),
        };
        for callback in &mut self.subscribers {
            callback(&message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSeverity;
    use crate::position::{Range, SourceSpan};
    use std::cell::RefCell;
    use std::rc::Rc;

    const TWO_FINDINGS: &str = r#"{"health":60,"valid":false,"errors":[
        {"id":"top_level_description","message":"Set a description","path":"","schemaLocation":"","position":[1,1,6,1]},
        {"id":"top_level_examples","message":"Set examples","path":"","schemaLocation":"","position":[2,3,2,40]}
    ]}"#;

    fn session_with_log() -> (PanelSession, Rc<RefCell<Vec<PanelViewState>>>) {
        let mut session = PanelSession::new(SessionOptions {
            extension_version: "1.2.3".to_string(),
            ..SessionOptions::default()
        });
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        session.subscribe(move |message| {
            let PanelMessage::Update { state } = message;
            sink.borrow_mut().push(state.clone());
        });
        session.dispatch(WebviewMessage::Ready);
        log.borrow_mut().clear();
        (session, log)
    }

    fn file(path: &str) -> Option<FocusedEditor> {
        Some(FocusedEditor::File(PathBuf::from(path)))
    }

    fn outcome(lint: &str, metaschema: (&str, i32)) -> AnalysisOutcome {
        AnalysisOutcome::from_raw(
            &RawToolResult::new(lint, if lint.contains("\"error\"") { 1 } else { 0 }),
            &RawToolResult::new(metaschema.0, metaschema.1),
            &RawToolResult::new("", 0),
        )
    }

    #[test]
    fn test_open_with_eligible_file_starts_loading() {
        let (mut session, log) = session_with_log();
        let ticket = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();

        assert_eq!(ticket.path(), Path::new("/s/a.json"));
        assert_eq!(session.phase(), PanelPhase::Loading);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert!(log[0].loading.lint && log[0].loading.metaschema && log[0].loading.format);
        assert_eq!(log[0].extension_version, "1.2.3");
    }

    #[test]
    fn test_ineligible_and_virtual_editors_go_idle() {
        let (mut session, _log) = session_with_log();
        session.handle_event(EditorEvent::PanelOpened {
            focused: file("/s/a.yaml"),
        });
        assert_eq!(session.phase(), PanelPhase::Loading);

        assert!(session.handle_event(EditorEvent::FocusChanged(file("/s/main.rs"))).is_none());
        assert_eq!(session.phase(), PanelPhase::Idle);
        assert!(session.focused().is_none());

        session.handle_event(EditorEvent::FocusChanged(file("/s/a.yaml")));
        assert!(
            session
                .handle_event(EditorEvent::FocusChanged(Some(FocusedEditor::Virtual)))
                .is_none()
        );
        assert_eq!(session.phase(), PanelPhase::Idle);
    }

    #[test]
    fn test_losing_editor_focus_keeps_state() {
        let (mut session, log) = session_with_log();
        session.handle_event(EditorEvent::PanelOpened {
            focused: file("/s/a.json"),
        });
        let published = log.borrow().len();

        assert!(session.handle_event(EditorEvent::FocusChanged(None)).is_none());
        assert_eq!(session.phase(), PanelPhase::Loading);
        assert_eq!(log.borrow().len(), published);
    }

    #[test]
    fn test_refocusing_same_document_does_not_restart() {
        let (mut session, _log) = session_with_log();
        let ticket = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        assert!(session.handle_event(EditorEvent::FocusChanged(file("/s/a.json"))).is_none());

        session.complete_cycle(ticket, Ok(outcome(TWO_FINDINGS, ("", 0))));
        assert_eq!(session.phase(), PanelPhase::Ready);
        assert!(session.handle_event(EditorEvent::FocusChanged(file("/s/a.json"))).is_none());
    }

    #[test]
    fn test_save_of_focused_document_reanalyzes() {
        let (mut session, _log) = session_with_log();
        let first = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        session.complete_cycle(first.clone(), Ok(outcome(TWO_FINDINGS, ("", 0))));

        assert!(
            session
                .handle_event(EditorEvent::DocumentSaved(PathBuf::from("/s/other.json")))
                .is_none()
        );
        let second = session
            .handle_event(EditorEvent::DocumentSaved(PathBuf::from("/s/a.json")))
            .unwrap();
        assert!(second.sequence() > first.sequence());
        assert_eq!(session.phase(), PanelPhase::Loading);
    }

    #[test]
    fn test_ready_cycle_projects_both_channels() {
        let (mut session, log) = session_with_log();
        let ticket = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        let uri = ticket.uri().clone();

        let metaschema = r#"{"errors":[{"error":"bad type","instanceLocation":"/type","keywordLocation":"/properties/type/anyOf","instancePosition":[2,11,2,18]}]}"#;
        let disposition = session.complete_cycle(ticket, Ok(outcome(TWO_FINDINGS, (metaschema, 2))));
        assert_eq!(disposition, CycleDisposition::Displayed);

        let lint = session.diagnostics().channel(Channel::Lint).get(&uri);
        assert_eq!(lint.len(), 2);
        assert!(lint.iter().all(|d| d.severity == DiagnosticSeverity::Warning));
        assert_eq!(lint[0].range, Range::origin());

        let errors = session.diagnostics().channel(Channel::Metaschema).get(&uri);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, DiagnosticSeverity::Error);

        let last = log.borrow().last().cloned().unwrap();
        assert_eq!(last.phase, PanelPhase::Ready);
        assert_eq!(last.lint_result.unwrap().health, Some(60));
        assert!(!last.loading.any());
    }

    #[test]
    fn test_stale_cycle_for_same_document_is_dropped() {
        let (mut session, _log) = session_with_log();
        let slow = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        let fresh = session
            .handle_event(EditorEvent::DocumentSaved(PathBuf::from("/s/a.json")))
            .unwrap();
        let uri = fresh.uri().clone();

        let clean = r#"{"health":100,"valid":true,"errors":[]}"#;
        assert_eq!(
            session.complete_cycle(fresh, Ok(outcome(clean, ("", 0)))),
            CycleDisposition::Displayed
        );
        assert_eq!(
            session.complete_cycle(slow, Ok(outcome(TWO_FINDINGS, ("", 0)))),
            CycleDisposition::Stale
        );

        assert!(session.diagnostics().channel(Channel::Lint).get(&uri).is_empty());
        assert_eq!(
            session.view().lint_result.as_ref().unwrap().health,
            Some(100)
        );
    }

    #[test]
    fn test_completion_after_focus_moved_updates_diagnostics_only() {
        let (mut session, _log) = session_with_log();
        let a = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        let b = session
            .handle_event(EditorEvent::FocusChanged(file("/s/b.json")))
            .unwrap();
        let a_uri = a.uri().clone();

        assert_eq!(
            session.complete_cycle(a, Ok(outcome(TWO_FINDINGS, ("", 0)))),
            CycleDisposition::Background
        );
        assert_eq!(session.diagnostics().channel(Channel::Lint).get(&a_uri).len(), 2);
        assert_eq!(session.phase(), PanelPhase::Loading);
        assert_eq!(session.view().file.as_ref().unwrap().uri, *b.uri());
    }

    #[test]
    fn test_invocation_failure_fills_every_slot() {
        let (mut session, _log) = session_with_log();
        let ticket = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        let err = ToolError::NotFound {
            program: "jsonschema".to_string(),
        };

        assert_eq!(
            session.complete_cycle(ticket, Err(err)),
            CycleDisposition::Displayed
        );
        let view = session.view();
        assert_eq!(view.phase, PanelPhase::Failed);
        let message = "schema tool not found: jsonschema";
        assert_eq!(view.lint_result.as_ref().unwrap().raw_output, message);
        assert!(view.lint_result.as_ref().unwrap().error);
        assert_eq!(view.metaschema_result.as_ref().unwrap().raw_output, message);
        assert_eq!(view.format_result.as_ref().unwrap().raw_output, message);
    }

    #[test]
    fn test_failure_keeps_previous_diagnostics() {
        let (mut session, _log) = session_with_log();
        let first = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        let uri = first.uri().clone();
        session.complete_cycle(first, Ok(outcome(TWO_FINDINGS, ("", 0))));

        let second = session
            .handle_event(EditorEvent::DocumentSaved(PathBuf::from("/s/a.json")))
            .unwrap();
        session.complete_cycle(
            second,
            Err(ToolError::TimedOut {
                operation: "lint",
                after: Duration::from_secs(5),
            }),
        );
        assert_eq!(session.phase(), PanelPhase::Failed);
        assert_eq!(session.diagnostics().channel(Channel::Lint).get(&uri).len(), 2);
    }

    #[test]
    fn test_close_clears_document_and_fences_in_flight_cycle() {
        let (mut session, _log) = session_with_log();
        let ticket = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        session.handle_event(EditorEvent::DocumentClosed(PathBuf::from("/s/a.json")));
        assert_eq!(session.phase(), PanelPhase::Idle);

        assert_eq!(
            session.complete_cycle(ticket, Ok(outcome(TWO_FINDINGS, ("", 0)))),
            CycleDisposition::Stale
        );
        assert_eq!(session.diagnostics().channel(Channel::Lint).document_count(), 0);
    }

    #[test]
    fn test_format_refused_on_parse_error() {
        let (mut session, _log) = session_with_log();
        let ticket = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        let broken = r#"{"error":"Unexpected token","line":3,"column":5,"filePath":"/s/a.json"}"#;
        session.complete_cycle(ticket, Ok(outcome(broken, ("not json", 1))));
        assert!(session.view().has_unrecoverable_parse_error);

        let Dispatch::Host(HostAction::ShowError { message }) =
            session.dispatch(WebviewMessage::FormatSchema)
        else {
            panic!("expected the format request to be refused");
        };
        assert!(message.contains("could not be parsed"));
        let format = session.view().format_result.as_ref().unwrap();
        assert!(format.error);
        assert_eq!(format.raw_output, message);
    }

    #[test]
    fn test_format_refused_while_reanalyzing_unparsable_document() {
        let (mut session, _log) = session_with_log();
        let ticket = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        let broken = r#"{"error":"Unexpected token","line":3,"column":5,"filePath":"/s/a.json"}"#;
        session.complete_cycle(ticket, Ok(outcome(broken, (broken, 1))));

        let reload = session
            .handle_event(EditorEvent::DocumentSaved(PathBuf::from("/s/a.json")))
            .unwrap();
        assert_eq!(session.phase(), PanelPhase::Loading);
        assert!(!session.view().has_unrecoverable_parse_error);
        assert!(matches!(
            session.dispatch(WebviewMessage::FormatSchema),
            Dispatch::Host(HostAction::ShowError { .. })
        ));

        // Once the document parses again, formatting is allowed.
        let clean = r#"{"health":100,"valid":true,"errors":[]}"#;
        session.complete_cycle(reload, Ok(outcome(clean, ("", 0))));
        assert!(matches!(
            session.dispatch(WebviewMessage::FormatSchema),
            Dispatch::Format(_)
        ));
    }

    #[test]
    fn test_cycle_completion_keeps_rewrite_in_flight_visible() {
        let (mut session, log) = session_with_log();
        let first = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        session.complete_cycle(first, Ok(outcome(TWO_FINDINGS, ("", 0))));

        let Dispatch::Format(format) = session.dispatch(WebviewMessage::FormatSchema) else {
            panic!("expected a format ticket");
        };
        let second = session
            .handle_event(EditorEvent::DocumentSaved(PathBuf::from("/s/a.json")))
            .unwrap();
        session.complete_cycle(second, Ok(outcome(TWO_FINDINGS, ("", 0))));

        let last = log.borrow().last().cloned().unwrap();
        assert_eq!(last.phase, PanelPhase::Ready);
        assert!(last.loading.format);
        assert!(!last.loading.lint && !last.loading.metaschema);

        session.complete_format(&format, Ok(RawToolResult::new("", 0)));
        assert!(!session.view().loading.any());
    }

    #[test]
    fn test_format_success_and_failure() {
        let (mut session, _log) = session_with_log();
        let ticket = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        session.complete_cycle(ticket, Ok(outcome(TWO_FINDINGS, ("", 0))));

        let Dispatch::Format(format) = session.dispatch(WebviewMessage::FormatSchema) else {
            panic!("expected a format ticket");
        };
        assert!(session.view().loading.format);
        assert_eq!(
            session.complete_format(&format, Ok(RawToolResult::new("", 0))),
            FormatDisposition::Formatted
        );
        assert!(!session.view().loading.format);
        assert!(session.view().format_result.as_ref().unwrap().is_formatted());

        let Dispatch::Format(format) = session.dispatch(WebviewMessage::FormatSchema) else {
            panic!("expected a format ticket");
        };
        let disposition =
            session.complete_format(&format, Ok(RawToolResult::new("Permission denied", 1)));
        assert_eq!(
            disposition,
            FormatDisposition::Failed {
                message: "Permission denied".to_string()
            }
        );
        // Lint diagnostics survive a formatting failure.
        assert_eq!(
            session
                .diagnostics()
                .channel(Channel::Lint)
                .get(format.uri())
                .len(),
            2
        );
    }

    #[test]
    fn test_go_to_position_and_links() {
        let (mut session, _log) = session_with_log();
        assert_eq!(
            session.dispatch(WebviewMessage::GoToPosition {
                position: SourceSpan::new(2, 3, 2, 5)
            }),
            Dispatch::Host(HostAction::None)
        );

        session.handle_event(EditorEvent::PanelOpened {
            focused: file("/s/a.json"),
        });
        let Dispatch::Host(HostAction::RevealRange { uri, range }) =
            session.dispatch(WebviewMessage::GoToPosition {
                position: SourceSpan::new(2, 3, 2, 5),
            })
        else {
            panic!("expected a reveal action");
        };
        assert_eq!(uri.as_str(), "file:///s/a.json");
        assert_eq!(range.start.line, 1);
        assert_eq!(range.start.character, 2);

        assert_eq!(
            session.dispatch(WebviewMessage::OpenExternal {
                url: "https://json-schema.org".to_string()
            }),
            Dispatch::Host(HostAction::OpenExternal {
                url: "https://json-schema.org".to_string()
            })
        );
        assert_eq!(
            session.dispatch(WebviewMessage::OpenExternal {
                url: "file:///etc/hosts".to_string()
            }),
            Dispatch::Host(HostAction::None)
        );
    }

    #[test]
    fn test_updates_wait_for_webview_readiness() {
        let mut session = PanelSession::new(SessionOptions::default());
        let count = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&count);
        session.subscribe(move |_| *sink.borrow_mut() += 1);

        session.handle_event(EditorEvent::PanelOpened {
            focused: file("/s/a.json"),
        });
        assert_eq!(*count.borrow(), 0);
        assert!(!session.is_webview_ready());

        session.dispatch(WebviewMessage::Ready);
        assert!(session.is_webview_ready());
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_dispose_clears_everything() {
        let (mut session, log) = session_with_log();
        let ticket = session
            .handle_event(EditorEvent::PanelOpened {
                focused: file("/s/a.json"),
            })
            .unwrap();
        session.complete_cycle(ticket, Ok(outcome(TWO_FINDINGS, ("", 0))));
        let published = log.borrow().len();

        session.dispose();
        assert_eq!(session.phase(), PanelPhase::Idle);
        assert_eq!(session.diagnostics().channel(Channel::Lint).document_count(), 0);
        assert!(!session.is_webview_ready());
        assert_eq!(log.borrow().len(), published);
    }
}
