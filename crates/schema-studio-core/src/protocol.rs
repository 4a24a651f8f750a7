//! Messages between the panel session, the display surface, and the host.
//!
//! - [`PanelMessage`]: session → webview (one message type, the full view state).
//! - [`WebviewMessage`]: webview → session, a closed set of commands.
//! - [`HostCommand`]: commands the host registers (open panel, readiness query).
//! - [`HostAction`]: what the host must do in response to a webview command.

use crate::document::DocumentUri;
use crate::position::{Range, SourceSpan};
use crate::view::PanelViewState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host command id that opens (or reveals) the panel.
pub const OPEN_PANEL_COMMAND: &str = "schema-studio.openPanel";
/// Host command id that reports whether the webview finished booting.
pub const IS_WEBVIEW_READY_COMMAND: &str = "schema-studio.isWebviewReady";

/// Session → webview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PanelMessage {
    /// Full replacement of the displayed state.
    Update {
        /// The new state.
        state: PanelViewState,
    },
}

/// Webview → session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebviewMessage {
    /// The webview finished booting and can receive updates.
    Ready,
    /// Reveal a tool-reported location in the focused document.
    GoToPosition {
        /// 1-based tool span.
        position: SourceSpan,
    },
    /// Open a link in the system browser.
    OpenExternal {
        /// Link target.
        url: String,
    },
    /// Format the focused document in place.
    FormatSchema,
}

/// Errors decoding a [`WebviewMessage`].
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("malformed webview message: {0}")]
    /// The message was not valid JSON or did not match any known command.
    Malformed(#[from] serde_json::Error),
}

impl WebviewMessage {
    /// Decode a message posted by the webview.
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Commands the host exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCommand {
    /// [`OPEN_PANEL_COMMAND`].
    OpenPanel,
    /// [`IS_WEBVIEW_READY_COMMAND`].
    IsWebviewReady,
}

impl HostCommand {
    /// Look a command up by its registered id.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            OPEN_PANEL_COMMAND => Some(Self::OpenPanel),
            IS_WEBVIEW_READY_COMMAND => Some(Self::IsWebviewReady),
            _ => None,
        }
    }

    /// The registered command id.
    pub fn id(self) -> &'static str {
        match self {
            Self::OpenPanel => OPEN_PANEL_COMMAND,
            Self::IsWebviewReady => IS_WEBVIEW_READY_COMMAND,
        }
    }
}

/// Work the host performs on behalf of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// Nothing to do.
    None,
    /// Focus the document and select `range`.
    RevealRange {
        /// Document to reveal.
        uri: DocumentUri,
        /// Zero-based range to select.
        range: Range,
    },
    /// Open `url` externally.
    OpenExternal {
        /// Link target (`http` or `https`).
        url: String,
    },
    /// Show a dismissible error notification.
    ShowError {
        /// Notification text.
        message: String,
    },
}

/// Whether a link may be handed to the system browser.
pub(crate) fn is_external_link(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_webview_messages() {
        assert_eq!(
            WebviewMessage::from_json(r#"{"type":"ready"}"#).unwrap(),
            WebviewMessage::Ready
        );
        assert_eq!(
            WebviewMessage::from_json(r#"{"type":"goToPosition","position":[3,5,3,9]}"#).unwrap(),
            WebviewMessage::GoToPosition {
                position: SourceSpan::new(3, 5, 3, 9)
            }
        );
        assert_eq!(
            WebviewMessage::from_json(r#"{"type":"openExternal","url":"https://example.com"}"#)
                .unwrap(),
            WebviewMessage::OpenExternal {
                url: "https://example.com".to_string()
            }
        );
        assert_eq!(
            WebviewMessage::from_json(r#"{"type":"formatSchema"}"#).unwrap(),
            WebviewMessage::FormatSchema
        );
    }

    #[test]
    fn test_reject_unknown_messages() {
        assert!(WebviewMessage::from_json(r#"{"type":"selfDestruct"}"#).is_err());
        assert!(WebviewMessage::from_json(r#"{"type":"goToPosition","position":[1,2]}"#).is_err());
        assert!(WebviewMessage::from_json("ready").is_err());
    }

    #[test]
    fn test_host_command_ids_roundtrip() {
        for command in [HostCommand::OpenPanel, HostCommand::IsWebviewReady] {
            assert_eq!(HostCommand::from_id(command.id()), Some(command));
        }
        assert_eq!(HostCommand::from_id("schema-studio.unknown"), None);
    }

    #[test]
    fn test_external_links() {
        assert!(is_external_link("https://json-schema.org"));
        assert!(is_external_link("HTTP://example.com"));
        assert!(!is_external_link("file:///etc/passwd"));
        assert!(!is_external_link("command:workbench.action.quit"));
    }

    #[test]
    fn test_update_message_shape() {
        let state = PanelViewState::idle(None, "0.1.0".to_string());
        let value = serde_json::to_value(PanelMessage::Update { state }).unwrap();
        assert_eq!(value["type"], "update");
        assert_eq!(value["state"]["phase"], "idle");
    }
}
