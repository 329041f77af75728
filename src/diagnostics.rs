//! Structured diagnostics collected during a compile run.
//!
//! Every recoverable data problem is logged through the `log` facade and kept
//! here, so callers can inspect what was substituted after the run finishes.

use serde::Serialize;
use std::sync::Mutex;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What kind of data problem was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No shape rule matched; fell back to `block`.
    DefaultShape,
    /// A shape id had no geometry.
    MissingShape,
    /// A shape copied itself.
    SelfCopy,
    /// A copy_block directive could not be followed.
    CopyBlock,
    /// Nested copies went past the configured depth.
    CopyDepth,
    /// A conditional or interpolation referenced a missing block state.
    MissingState,
    /// An expression could not be parsed.
    MalformedExpression,
    /// An interpolation placeholder resolved to nothing.
    MissingArrayValue,
    /// A terrain texture key had no entry.
    MissingTerrainTexture,
    /// A block had no face table entry for a face.
    MissingFace,
    /// A texture variant index was unknown or out of range.
    UnknownVariant,
    /// A tint colour could not be parsed.
    InvalidTint,
    /// A cube declared a zero, negative or non-finite texture size.
    InvalidTextureSize,
    /// An image could not be fetched or decoded.
    ImageLoad,
}

/// A single recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Thread-safe diagnostic collector.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{}", message);
        self.push(Severity::Info, kind, message);
    }

    pub fn warn(&self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.push(Severity::Warning, kind, message);
    }

    pub fn error(&self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.push(Severity::Error, kind, message);
    }

    fn push(&self, severity: Severity, kind: DiagnosticKind, message: String) {
        // A poisoned lock only means another thread panicked mid-push.
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(Diagnostic {
            severity,
            kind,
            message,
        });
    }

    /// Number of diagnostics of the given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.snapshot().iter().filter(|d| d.kind == kind).count()
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drain into a plain list.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        match self.entries.into_inner() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_in_order() {
        let diagnostics = Diagnostics::new();
        diagnostics.warn(DiagnosticKind::MissingShape, "no shape for slab");
        diagnostics.error(DiagnosticKind::SelfCopy, "stairs copies stairs");

        let entries = diagnostics.into_vec();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, Severity::Warning);
        assert_eq!(entries[1].kind, DiagnosticKind::SelfCopy);
    }

    #[test]
    fn test_count_by_kind() {
        let diagnostics = Diagnostics::new();
        diagnostics.info(DiagnosticKind::DefaultShape, "a");
        diagnostics.info(DiagnosticKind::DefaultShape, "b");
        diagnostics.warn(DiagnosticKind::ImageLoad, "c");
        assert_eq!(diagnostics.count(DiagnosticKind::DefaultShape), 2);
        assert_eq!(diagnostics.count(DiagnosticKind::MissingState), 0);
    }
}
