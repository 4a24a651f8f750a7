//! Document identity and eligibility.
//!
//! Diagnostics are keyed by `file://` URIs built from the host-provided path. The path is taken as
//! given (hosts canonicalize before reporting it), so identity never depends on filesystem reads.

use serde::Serialize;
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};

/// Extensions (lowercase, without the dot) the panel analyzes.
pub const ELIGIBLE_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// A `file://` URI identifying a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentUri(String);

impl DocumentUri {
    /// Build a URI from a filesystem path.
    pub fn from_path(path: &Path) -> Self {
        let mut path_str = path.to_string_lossy().to_string();

        if cfg!(windows) {
            path_str = path_str.replace('\\', "/");
            if !path_str.starts_with('/') {
                path_str.insert(0, '/');
            }
        }

        Self(format!("file://{}", percent_encode_path(&path_str)))
    }

    /// The URI text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Percent-encode a path for use in a `file://` URI.
///
/// Unreserved bytes and `/` pass through; everything else becomes `%XX`.
pub fn percent_encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Whether the panel analyzes files with this path's extension (case-insensitive).
pub fn is_eligible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ELIGIBLE_EXTENSIONS
                .iter()
                .any(|eligible| ext.eq_ignore_ascii_case(eligible))
        })
}

/// What the host reports about the focused editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusedEditor {
    /// An editor backed by a file on disk.
    File(PathBuf),
    /// An editor with no backing file (untitled buffer, diff view, output channel, ...).
    Virtual,
}

/// The file the panel is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Absolute path as reported by the host.
    pub path: PathBuf,
    /// Document identity.
    pub uri: DocumentUri,
    /// Final path component, for display.
    pub file_name: String,
    /// Lowercased extension.
    pub extension: String,
}

impl FileDescriptor {
    /// Describe `path` if it is an eligible document.
    pub fn eligible(path: &Path) -> Option<Self> {
        if !is_eligible(path) {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            uri: DocumentUri::from_path(path),
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
            extension: path
                .extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligible_extensions_are_case_insensitive() {
        assert!(is_eligible(Path::new("/s/schema.json")));
        assert!(is_eligible(Path::new("/s/schema.JSON")));
        assert!(is_eligible(Path::new("/s/schema.Yaml")));
        assert!(is_eligible(Path::new("/s/schema.yml")));
        assert!(!is_eligible(Path::new("/s/schema.jsonc")));
        assert!(!is_eligible(Path::new("/s/schema.ts")));
        assert!(!is_eligible(Path::new("/s/json")));
    }

    #[test]
    fn test_uri_escapes_spaces_and_non_ascii() {
        let uri = DocumentUri::from_path(Path::new("/tmp/my schemas/café.json"));
        assert_eq!(uri.as_str(), "file:///tmp/my%20schemas/caf%C3%A9.json");
        assert_eq!(percent_encode_path("/a-b_c.d~e"), "/a-b_c.d~e");
    }

    #[test]
    fn test_descriptor_for_eligible_file() {
        let descriptor = FileDescriptor::eligible(Path::new("/tmp/Person.YML")).unwrap();
        assert_eq!(descriptor.file_name, "Person.YML");
        assert_eq!(descriptor.extension, "yml");
        assert_eq!(descriptor.uri.as_str(), "file:///tmp/Person.YML");

        assert_eq!(FileDescriptor::eligible(Path::new("/tmp/readme.md")), None);
    }
}
