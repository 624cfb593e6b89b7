//! Rich rendering for accumulated diagnostics.
//!
//! Produces human-readable, source-annotated output (similar to `rustc`) from
//! a source string and the engine's diagnostics. Uses `Renderer::plain()`
//! (no ANSI codes) so the output is stable for tests and log-safe.

use annotate_snippets::{Level, Renderer, Snippet};

use super::{Diagnostic, Severity};

fn level_of(severity: Severity) -> Level {
    match severity {
        Severity::Error => Level::Error,
        Severity::Note => Level::Note,
    }
}

/// Render a single diagnostic with source context.
///
/// - `source`: the full source text the diagnostic's span points into.
/// - `path`: optional file path for the `-->` origin line.
pub fn render(source: &str, path: Option<&str>, diag: &Diagnostic) -> String {
    let renderer = Renderer::plain();
    let level = level_of(diag.severity);
    if diag.span.end <= source.len() && diag.span.start < diag.span.end {
        let mut snippet = Snippet::source(source).fold(true);
        if let Some(p) = path {
            snippet = snippet.origin(p);
        }
        let snippet =
            snippet.annotation(level.span(diag.span.start..diag.span.end).label(&diag.message));
        let msg = level.title(&diag.message).snippet(snippet);
        renderer.render(msg).to_string()
    } else {
        let msg = level.title(&diag.message);
        renderer.render(msg).to_string()
    }
}

/// Render every diagnostic, one block per entry, separated by blank lines.
pub fn render_all(source: &str, path: Option<&str>, diags: &[Diagnostic]) -> String {
    diags
        .iter()
        .map(|d| render(source, path, d))
        .collect::<Vec<_>>()
        .join("\n\n")
}
