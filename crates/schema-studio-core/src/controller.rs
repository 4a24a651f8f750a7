//! Async driver tying a [`PanelSession`] to a [`SchemaTool`].
//!
//! The controller is single-threaded: the session lives in an `Rc<RefCell<_>>` and is only
//! borrowed between awaits, never across one. Several cycles can therefore be in flight at once
//! (for example a slow lint of one document while another is focused), and the session's fencing
//! decides which results land.

use crate::analysis::analyze;
use crate::document::FocusedEditor;
use crate::protocol::{HostAction, HostCommand, PanelMessage, WebviewMessage};
use crate::session::{
    CycleDisposition, CycleTicket, Dispatch, EditorEvent, FormatDisposition, FormatTicket,
    PanelSession, SessionOptions,
};
use crate::tool::{FormatMode, SchemaTool};
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

/// Result of executing a [`HostCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutput {
    /// The command has no return value.
    None,
    /// Answer to [`HostCommand::IsWebviewReady`].
    Ready(bool),
}

/// Runs analysis and format work for one panel.
pub struct PanelController<T> {
    session: Rc<RefCell<PanelSession>>,
    tool: T,
    version_requested: Cell<bool>,
}

impl<T: SchemaTool> PanelController<T> {
    /// Create a controller with an idle session.
    pub fn new(tool: T, options: SessionOptions) -> Self {
        Self {
            session: Rc::new(RefCell::new(PanelSession::new(options))),
            tool,
            version_requested: Cell::new(false),
        }
    }

    /// Borrow the session for inspection.
    pub fn session(&self) -> Ref<'_, PanelSession> {
        self.session.borrow()
    }

    /// The underlying tool.
    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Register a display callback. See [`PanelSession::subscribe`].
    pub fn subscribe<F>(&self, callback: F)
    where
        F: FnMut(&PanelMessage) + 'static,
    {
        self.session.borrow_mut().subscribe(callback);
    }

    /// Forward a host event, running the resulting cycle to completion.
    ///
    /// Returns `None` when the event did not start a cycle.
    pub async fn handle_event(&self, event: EditorEvent) -> Option<CycleDisposition> {
        let ticket = self.session.borrow_mut().handle_event(event)?;
        Some(self.run_cycle(ticket).await)
    }

    /// Handle a webview message and return the action the host should take.
    pub async fn handle_message(&self, message: WebviewMessage) -> HostAction {
        let dispatch = self.session.borrow_mut().dispatch(message);
        match dispatch {
            Dispatch::Host(action) => action,
            Dispatch::Format(ticket) => self.format(ticket).await,
        }
    }

    /// Execute a registered host command.
    pub async fn execute(
        &self,
        command: HostCommand,
        focused: Option<FocusedEditor>,
    ) -> CommandOutput {
        tracing::debug!(command = command.id(), "executing host command");
        match command {
            HostCommand::OpenPanel => {
                self.handle_event(EditorEvent::PanelOpened { focused }).await;
                CommandOutput::None
            }
            HostCommand::IsWebviewReady => {
                CommandOutput::Ready(self.session.borrow().is_webview_ready())
            }
        }
    }

    /// Close the panel.
    pub fn dispose(&self) {
        tracing::debug!("disposing panel session");
        self.session.borrow_mut().dispose();
    }

    async fn run_cycle(&self, ticket: CycleTicket) -> CycleDisposition {
        let path = ticket.path().to_path_buf();
        let ((), result) = tokio::join!(self.ensure_tool_version(), analyze(&self.tool, &path));
        self.session.borrow_mut().complete_cycle(ticket, result)
    }

    async fn ensure_tool_version(&self) {
        if self.version_requested.replace(true) {
            return;
        }
        match self.tool.version().await {
            Ok(version) => {
                let version = version.trim().to_string();
                tracing::info!(%version, "detected schema tool");
                self.session.borrow_mut().set_tool_version(Some(version));
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not determine schema tool version");
            }
        }
    }

    async fn format(&self, ticket: FormatTicket) -> HostAction {
        let result = self
            .tool
            .format(ticket.path(), FormatMode::Rewrite)
            .await
            .and_then(|raw| raw.check("format"));
        let disposition = self.session.borrow_mut().complete_format(&ticket, result);

        match disposition {
            FormatDisposition::Failed { message } => HostAction::ShowError { message },
            FormatDisposition::Formatted => {
                let delay = self.session.borrow().options().format_settle_delay;
                tokio::time::sleep(delay).await;

                let refreshed = self.session.borrow_mut().refresh(ticket.uri());
                if let Some(ticket) = refreshed {
                    self.run_cycle(ticket).await;
                }
                HostAction::None
            }
        }
    }
}
