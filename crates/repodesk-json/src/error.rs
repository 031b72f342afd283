use repodesk_source::ByteOffset;
use repodesk_source::Diagnostic;
use repodesk_source::DiagnosticRenderer;
use repodesk_source::LineCol;
use repodesk_source::LineIndex;
use repodesk_source::Severity;
use repodesk_source::Span;
use thiserror::Error;

/// Diagnostic code used when rendering JSON syntax errors.
pub const SYNTAX_ERROR_CODE: &str = "J001";

/// A JSON syntax error with the location the editor should highlight.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {} column {}", .position.line(), .position.column())]
pub struct ValidationError {
    message: String,
    offset: ByteOffset,
    position: LineCol,
}

impl ValidationError {
    pub(crate) fn from_serde(source: &str, err: &serde_json::Error) -> Self {
        let index = LineIndex::from_text(source);
        let reported = LineCol::new(
            u32::try_from(err.line()).unwrap_or(u32::MAX),
            u32::try_from(err.column()).unwrap_or(u32::MAX),
        );
        let offset = index
            .offset(reported)
            .unwrap_or_else(|| ByteOffset::from_usize(source.len()));
        let offset = dangling_comma_before(source, offset).unwrap_or(offset);

        Self {
            message: strip_location(err),
            offset,
            position: index.to_line_col(offset),
        }
    }

    /// The parser's message without the trailing location.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn offset(&self) -> ByteOffset {
        self.offset
    }

    #[must_use]
    pub fn position(&self) -> LineCol {
        self.position
    }

    /// Render this error against the content it came from as an annotated
    /// snippet.
    #[must_use]
    pub fn render(&self, path: &str, source: &str, renderer: &DiagnosticRenderer) -> String {
        let diagnostic = Diagnostic::new(
            source,
            path,
            SYNTAX_ERROR_CODE,
            "invalid JSON",
            Severity::Error,
            Span::at_char(source, self.offset),
            &self.message,
        );
        renderer.render(&diagnostic)
    }
}

/// serde_json appends " at line L column C" to every syntax error message.
fn strip_location(err: &serde_json::Error) -> String {
    let full = err.to_string();
    let suffix = format!(" at line {} column {}", err.line(), err.column());
    match full.strip_suffix(&suffix) {
        Some(message) => message.to_string(),
        None => full,
    }
}

/// When the parser stops on a closing bracket that follows a comma, the comma
/// is the actual mistake.
fn dangling_comma_before(source: &str, offset: ByteOffset) -> Option<ByteOffset> {
    let bytes = source.as_bytes();
    let at = *bytes.get(offset.as_usize())?;
    if at != b'}' && at != b']' {
        return None;
    }
    let comma = bytes[..offset.as_usize()]
        .iter()
        .rposition(|byte| !matches!(byte, b' ' | b'\t' | b'\n' | b'\r'))?;
    (bytes[comma] == b',').then(|| ByteOffset::from_usize(comma))
}
