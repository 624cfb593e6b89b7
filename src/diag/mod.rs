//! Diagnostic accumulation and rendering.
//!
//! The engine collects spanned diagnostics (errors and the notes that
//! explain them); [`render`] turns them into human-readable, source-annotated
//! output. Emission can be suppressed for the duration of a SFINAE trap, in
//! which case only the count of attempted errors is visible to the trap
//! holder.

mod render;

pub use render::{render, render_all};

use serde::Serialize;

use crate::ast::Span;

/// Severity of an emitted diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Note,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub span: Span,
    pub message: String,
}

/// The record of a substitution failure in an immediate context: where it
/// happened, what it said, and the entity being substituted into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubstitutionDiagnostic {
    pub span: Span,
    pub message: String,
    pub entity: String,
}

#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diags: Vec<Diagnostic>,
    suppress_depth: usize,
    errors_attempted: usize,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors_attempted += 1;
        if self.suppress_depth == 0 {
            self.diags.push(Diagnostic {
                severity: Severity::Error,
                span,
                message: message.into(),
            });
        }
    }

    pub fn note(&mut self, span: Span, message: impl Into<String>) {
        if self.suppress_depth == 0 {
            self.diags.push(Diagnostic {
                severity: Severity::Note,
                span,
                message: message.into(),
            });
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diags
    }

    pub fn error_count(&self) -> usize {
        self.diags
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diags)
    }

    pub(crate) fn push_suppression(&mut self) -> usize {
        self.suppress_depth += 1;
        self.errors_attempted
    }

    pub(crate) fn pop_suppression(&mut self, watermark: usize) -> bool {
        debug_assert!(self.suppress_depth > 0);
        self.suppress_depth -= 1;
        self.errors_attempted > watermark
    }
}
