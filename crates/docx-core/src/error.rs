use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Failures that abort a conversion. Problems inside a document are
/// [`Diagnostics`] instead.
#[derive(Error, Debug)]
pub enum DocxError {
    #[error("CSS error: {0}")]
    Css(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No document parts supplied")]
    NoParts,

    #[error("{0}")]
    Other(String),
}

impl From<fmt::Error> for DocxError {
    fn from(e: fmt::Error) -> Self {
        DocxError::Css(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DocxError>;

/// Category of a recoverable problem met while processing one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An expected part is absent or unparseable; defaults were substituted.
    MissingPart,
    /// A structural query could not be evaluated; treated as no match.
    QueryFailure,
    /// A numbering or basedOn reference points at nothing.
    UnresolvableReference,
    /// A single style/level/instance node was skipped.
    MalformedNode,
}

/// A recoverable problem, reported alongside a best-effort result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Part the problem was found in ("styles", "numbering", ...).
    pub part: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:?}: {}", self.part, self.kind, self.message)
    }
}

/// Collects diagnostics for one document. Every push is also logged.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, kind: DiagnosticKind, part: &str, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            part: part.to_string(),
            message: message.into(),
        };
        log::warn!("{}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_count_by_kind() {
        let mut diags = Diagnostics::new();
        diags.push(DiagnosticKind::UnresolvableReference, "numbering", "abstractNum 7");
        diags.push(DiagnosticKind::MalformedNode, "styles", "style without id");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.count(DiagnosticKind::UnresolvableReference), 1);
        assert_eq!(diags.count(DiagnosticKind::QueryFailure), 0);
    }

    #[test]
    fn test_write_failure_is_css_error() {
        let err: DocxError = fmt::Error.into();
        assert!(matches!(err, DocxError::Css(_)));
        assert_eq!(DocxError::NoParts.to_string(), "No document parts supplied");
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            kind: DiagnosticKind::MissingPart,
            part: "theme".to_string(),
            message: "absent".to_string(),
        };
        assert_eq!(d.to_string(), "[theme] MissingPart: absent");
    }
}
