//! Plain-text diagnostic output.

use schema_studio_core::{Diagnostic, DiagnosticSeverity};
use std::io::{self, Write};
use std::path::Path;

/// Diagnostic counts across every checked document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub errors: usize,
    pub warnings: usize,
    /// Documents the tool could not parse.
    pub unparsable: usize,
    pub failures: usize,
}

impl Tally {
    pub fn add(&mut self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            match diagnostic.severity {
                DiagnosticSeverity::Error => self.errors += 1,
                DiagnosticSeverity::Warning => self.warnings += 1,
                DiagnosticSeverity::Information | DiagnosticSeverity::Hint => {}
            }
        }
    }

    /// Process status for `check`: 2 when the tool failed, 1 for errors or unparsable documents.
    pub fn status(&self) -> u8 {
        if self.failures > 0 {
            2
        } else if self.errors > 0 || self.unparsable > 0 {
            1
        } else {
            0
        }
    }
}

fn severity_label(severity: DiagnosticSeverity) -> &'static str {
    match severity {
        DiagnosticSeverity::Error => "error",
        DiagnosticSeverity::Warning => "warning",
        DiagnosticSeverity::Information => "info",
        DiagnosticSeverity::Hint => "hint",
    }
}

/// Write `path:line:col: severity[code] message` lines, 1-based, with annotations indented below.
pub fn render(out: &mut impl Write, path: &Path, diagnostics: &[Diagnostic]) -> io::Result<()> {
    for diagnostic in diagnostics {
        let start = diagnostic.range.start;
        write!(
            out,
            "{}:{}:{}: {}",
            path.display(),
            start.line + 1,
            start.character + 1,
            severity_label(diagnostic.severity)
        )?;
        if let Some(code) = &diagnostic.code
            && !code.value.is_empty()
        {
            write!(out, "[{}]", code.value)?;
        }
        writeln!(out, " {} ({})", diagnostic.message, diagnostic.source)?;

        for related in &diagnostic.related_information {
            writeln!(out, "    {}", related.message)?;
        }
        if let Some(target) = diagnostic.code.as_ref().and_then(|code| code.target.as_ref()) {
            writeln!(out, "    see {target}")?;
        }
    }
    Ok(())
}
