use annotate_snippets::AnnotationKind;
use annotate_snippets::Level;
use annotate_snippets::Renderer;
use annotate_snippets::Snippet;

use crate::Span;

/// Severity level for rendered diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic ready for rendering: one labelled span in one file.
#[derive(Debug)]
pub struct Diagnostic<'a> {
    pub source: &'a str,
    pub path: &'a str,
    pub code: &'a str,
    pub message: &'a str,
    pub severity: Severity,
    pub span: Span,
    pub label: &'a str,
    pub notes: Vec<&'a str>,
}

impl<'a> Diagnostic<'a> {
    #[must_use]
    pub fn new(
        source: &'a str,
        path: &'a str,
        code: &'a str,
        message: &'a str,
        severity: Severity,
        span: Span,
        label: &'a str,
    ) -> Self {
        Self {
            source,
            path,
            code,
            message,
            severity,
            span,
            label,
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn note(mut self, note: &'a str) -> Self {
        self.notes.push(note);
        self
    }
}

/// Renders diagnostics as annotated source snippets using `annotate-snippets`.
///
/// `plain` output carries no ANSI escapes and is what tests and piped output
/// use; `styled` is for terminals.
#[derive(Debug)]
pub struct DiagnosticRenderer {
    renderer: Renderer,
}

impl DiagnosticRenderer {
    #[must_use]
    pub fn plain() -> Self {
        Self {
            renderer: Renderer::plain(),
        }
    }

    #[must_use]
    pub fn styled() -> Self {
        Self {
            renderer: Renderer::styled(),
        }
    }

    #[must_use]
    pub fn render(&self, diagnostic: &Diagnostic<'_>) -> String {
        let level = match diagnostic.severity {
            Severity::Error => Level::ERROR,
            Severity::Warning => Level::WARNING,
        };

        let start = diagnostic.span.start_usize().min(diagnostic.source.len());
        let end = (diagnostic.span.end() as usize).clamp(start, diagnostic.source.len());

        let snippet = Snippet::source(diagnostic.source)
            .path(diagnostic.path)
            .line_start(1)
            .annotation(
                AnnotationKind::Primary
                    .span(start..end)
                    .label(diagnostic.label),
            );

        let mut title = level
            .primary_title(diagnostic.message)
            .id(diagnostic.code)
            .element(snippet);

        for note in &diagnostic.notes {
            title = title.element(Level::NOTE.message(*note));
        }

        self.renderer.render(&[title])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_path_and_label() {
        let source = "{\n  \"a\": 1,\n}\n";

        let diag = Diagnostic::new(
            source,
            "config/app.json",
            "J001",
            "trailing comma",
            Severity::Error,
            Span::new(11, 1),
            "remove this comma",
        );
        let output = DiagnosticRenderer::plain().render(&diag);

        assert!(output.contains("error[J001]"), "should have error header");
        assert!(output.contains("trailing comma"), "should have message");
        assert!(output.contains("config/app.json"), "should have file path");
        assert!(output.contains("\"a\": 1,"), "should show source line");
        assert!(output.contains("remove this comma"), "should have label");
        assert!(output.contains('^'), "should have underline caret");
    }

    #[test]
    fn renders_notes_and_warning_level() {
        let source = "[1, 2]";
        let diag = Diagnostic::new(
            source,
            "list.json",
            "J100",
            "file is not formatted",
            Severity::Warning,
            Span::new(0, 1),
            "formatting differs from here",
        )
        .note("run `repodesk fmt list.json`");

        let output = DiagnosticRenderer::plain().render(&diag);
        assert!(output.contains("warning[J100]"));
        assert!(output.contains("note: run `repodesk fmt list.json`"));
    }

    #[test]
    fn empty_span_at_end_of_source() {
        let source = "{\"a\": ";
        let diag = Diagnostic::new(
            source,
            "cut.json",
            "J001",
            "EOF while parsing a value",
            Severity::Error,
            Span::new(6, 0),
            "input ends here",
        );
        let output = DiagnosticRenderer::plain().render(&diag);
        assert!(output.contains("EOF while parsing a value"));
        assert!(!output.contains("\x1b["), "plain output has no ANSI codes");
    }

    #[test]
    fn styled_produces_ansi() {
        let diag = Diagnostic::new(
            "{]",
            "bad.json",
            "J001",
            "expected value",
            Severity::Error,
            Span::new(1, 1),
            "here",
        );
        let output = DiagnosticRenderer::styled().render(&diag);
        assert!(output.contains("\x1b["));
    }
}
