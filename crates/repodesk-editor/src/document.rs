use repodesk_json::ValidationError;
use repodesk_json::ValidationResult;
use repodesk_workspace::Fingerprint;

/// The file open in the editor and its live validation state.
///
/// `content` is what a save writes; nothing else rewrites it.
#[derive(Clone, Debug)]
pub struct EditableDocument {
    /// Relative to the workspace root.
    path: String,
    content: String,
    validation: ValidationResult,
    revision: u64,
    /// Content fingerprint on disk as of the last load or save.
    fingerprint: Fingerprint,
}

impl EditableDocument {
    pub(crate) fn new(path: String, content: String, revision: u64) -> Self {
        let validation = repodesk_json::validate(&content);
        let fingerprint = Fingerprint::of(content.as_bytes());
        Self {
            path,
            content,
            validation,
            revision,
            fingerprint,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation.is_ok()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&ValidationError> {
        self.validation.error()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub(crate) fn replace(&mut self, content: String, revision: u64) {
        self.validation = repodesk_json::validate(&content);
        self.content = content;
        self.revision = revision;
    }

    pub(crate) fn set_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.fingerprint = fingerprint;
    }

    pub(crate) fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            path: self.path.clone(),
            content: self.content.clone(),
            revision: self.revision,
            valid: self.is_valid(),
        }
    }
}

/// What observers of a session see after every document replacement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub path: String,
    pub content: String,
    pub revision: u64,
    pub valid: bool,
}
