//! JSON validation and canonical formatting for editor content.
//!
//! Validation is a live signal: it runs on every edit and never fails in the
//! `Result` sense. [`validate`] always returns a [`ValidationResult`];
//! [`format`] is the only operation that returns an error, and it returns the
//! same [`ValidationError`] that [`validate`] would report.
//!
//! Objects keep their key order and numbers keep their literal spelling, so
//! formatting only changes whitespace.

mod error;

use repodesk_source::ByteOffset;
use serde::Serialize;
use serde_json::Value;

pub use crate::error::ValidationError;
pub use crate::error::SYNTAX_ERROR_CODE;

/// Diagnostic code for valid content that is not in canonical form.
pub const UNFORMATTED_CODE: &str = "J002";

/// Outcome of validating editor content as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    formatted: Option<String>,
    error: Option<ValidationError>,
}

impl ValidationResult {
    /// True if and only if the content parsed as JSON.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The canonical form of valid content.
    #[must_use]
    pub fn formatted(&self) -> Option<&str> {
        self.formatted.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(ValidationError::message)
    }

    #[must_use]
    pub fn error_position(&self) -> Option<u32> {
        self.error.as_ref().map(|error| error.offset().get())
    }

}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationResultWire<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_column: Option<u32>,
}

impl Serialize for ValidationResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ValidationResultWire {
            ok: self.is_ok(),
            formatted: self.formatted(),
            error_message: self.error_message(),
            error_position: self.error_position(),
            error_line: self.error.as_ref().map(|error| error.position().line()),
            error_column: self.error.as_ref().map(|error| error.position().column()),
        }
        .serialize(serializer)
    }
}

/// Parse `content` as JSON and report either its canonical form or where
/// parsing failed.
#[must_use]
pub fn validate(content: &str) -> ValidationResult {
    match parse(content) {
        Ok(value) => ValidationResult {
            formatted: Some(pretty(&value)),
            error: None,
        },
        Err(error) => ValidationResult {
            formatted: None,
            error: Some(error),
        },
    }
}

/// Re-serialize valid JSON with 2-space indentation and no trailing newline.
///
/// `format(&format(x)?)? == format(x)?` for every valid `x`.
pub fn format(content: &str) -> Result<String, ValidationError> {
    parse(content).map(|value| pretty(&value))
}

/// Where `content` first departs from its canonical form, or `None` if it is
/// already formatted.
pub fn unformatted_at(content: &str) -> Result<Option<ByteOffset>, ValidationError> {
    let formatted = format(content)?;
    if formatted == content {
        return Ok(None);
    }
    let common = content
        .bytes()
        .zip(formatted.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    Ok(Some(ByteOffset::from_usize(common)))
}

fn parse(content: &str) -> Result<Value, ValidationError> {
    serde_json::from_str(content).map_err(|err| ValidationError::from_serde(content, &err))
}

fn pretty(value: &Value) -> String {
    // The alternate form of `Value`'s Display is serde_json's pretty printer.
    format!("{value:#}")
}
