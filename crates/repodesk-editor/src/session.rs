use camino::Utf8PathBuf;
use repodesk_conf::EditorSettings;
use repodesk_json::ValidationResult;
use repodesk_workspace::Fingerprint;
use repodesk_workspace::Listing;
use repodesk_workspace::Workspace;
use repodesk_workspace::WorkspaceError;
use tokio::sync::watch;

use crate::document::DocumentSnapshot;
use crate::document::EditableDocument;
use crate::error::SessionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No document open.
    Idle,
    /// A load is outstanding. A previously open document, if any, stays
    /// readable but cannot be edited or saved.
    Loading,
    /// Content matches what was last loaded or saved.
    Ready,
    /// Content was changed since the last load or save.
    Dirty,
    /// A save is outstanding. Edits are still accepted.
    Saving,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer selection (or a close) happened after this load was issued.
    Stale,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The written content is still the current content.
    Saved,
    /// Written, but the document was edited while the save was in flight.
    Superseded,
    /// The document the save was issued for is no longer open.
    Stale,
}

/// A file read the session is waiting for.
#[derive(Debug)]
#[must_use = "a load request does nothing until it is run and completed"]
pub struct LoadRequest {
    generation: u64,
    path: String,
    /// Guarded location of `path`. The root itself has an empty display path,
    /// so reads go through this instead.
    resolved: Utf8PathBuf,
}

impl LoadRequest {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn run(self, workspace: &Workspace) -> LoadResponse {
        let result = workspace.read(self.resolved.as_str()).await;
        LoadResponse {
            generation: self.generation,
            path: self.path,
            result,
        }
    }
}

#[derive(Debug)]
pub struct LoadResponse {
    generation: u64,
    path: String,
    result: Result<String, WorkspaceError>,
}

/// A snapshot of document content waiting to be written.
#[derive(Debug)]
#[must_use = "a save request does nothing until it is run and completed"]
pub struct SaveRequest {
    generation: u64,
    path: String,
    content: String,
    expected: Option<Fingerprint>,
}

impl SaveRequest {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    pub async fn run(self, workspace: &Workspace) -> SaveResponse {
        let result = match self.expected {
            Some(expected) => {
                workspace
                    .write_checked(&self.path, &self.content, expected)
                    .await
            }
            None => workspace
                .write(&self.path, &self.content)
                .await
                .map(|()| Fingerprint::of(self.content.as_bytes())),
        };
        SaveResponse {
            generation: self.generation,
            content: self.content,
            result,
        }
    }
}

#[derive(Debug)]
pub struct SaveResponse {
    generation: u64,
    content: String,
    result: Result<Fingerprint, WorkspaceError>,
}

/// Editing state for one workspace: at most one open document.
#[derive(Debug)]
pub struct EditorSession {
    workspace: Workspace,
    settings: EditorSettings,
    state: SessionState,
    document: Option<EditableDocument>,
    /// Bumped by every selection and by `close`. Load responses carrying an
    /// older value are discarded.
    generation: u64,
    /// Generation that loaded the open document.
    document_generation: u64,
    /// Where a failed load leaves the session.
    resume: SessionState,
    /// Generation of the document an outstanding save belongs to.
    saving: Option<u64>,
    revision: u64,
    updates: watch::Sender<Option<DocumentSnapshot>>,
}

impl EditorSession {
    #[must_use]
    pub fn new(workspace: Workspace, settings: EditorSettings) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            workspace,
            settings,
            state: SessionState::Idle,
            document: None,
            generation: 0,
            document_generation: 0,
            resume: SessionState::Idle,
            saving: None,
            revision: 0,
            updates,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn document(&self) -> Option<&EditableDocument> {
        self.document.as_ref()
    }

    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Observe document replacements. The receiver starts at the current
    /// document, `None` when nothing is open.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<DocumentSnapshot>> {
        self.updates.subscribe()
    }

    /// Files the editor offers, filtered by the configured extensions.
    pub async fn list(&self) -> Result<Listing, SessionError> {
        let listing = self.workspace.list(".").await?;
        Ok(listing.editable_files(&self.settings.extensions))
    }

    /// Start loading `path`, superseding any load still outstanding.
    ///
    /// A path the guard rejects leaves the session untouched.
    pub fn select(&mut self, path: &str) -> Result<LoadRequest, SessionError> {
        let resolved = self.workspace.resolve(path)?;
        let path = self.workspace.display_path(&resolved);

        self.generation += 1;
        if self.state != SessionState::Loading {
            self.resume = self.state;
        }
        self.state = SessionState::Loading;
        tracing::debug!(%path, generation = self.generation, "selected file");

        Ok(LoadRequest {
            generation: self.generation,
            path,
            resolved,
        })
    }

    pub fn complete_load(&mut self, response: LoadResponse) -> Result<LoadOutcome, SessionError> {
        if response.generation != self.generation {
            tracing::debug!(
                path = %response.path,
                generation = response.generation,
                current = self.generation,
                "discarding stale load"
            );
            return Ok(LoadOutcome::Stale);
        }

        match response.result {
            Ok(content) => {
                self.revision += 1;
                self.document = Some(EditableDocument::new(
                    response.path,
                    content,
                    self.revision,
                ));
                self.document_generation = self.generation;
                self.saving = None;
                self.state = SessionState::Ready;
                self.publish();
                Ok(LoadOutcome::Applied)
            }
            Err(err) => {
                tracing::warn!(path = %response.path, %err, "load failed");
                self.state = self.resume;
                Err(err.into())
            }
        }
    }

    /// Select, read and apply `path` in one step.
    pub async fn open(&mut self, path: &str) -> Result<LoadOutcome, SessionError> {
        let request = self.select(path)?;
        let response = request.run(&self.workspace).await;
        self.complete_load(response)
    }

    /// Replace the document content. Every replacement gets a new revision
    /// and is published to subscribers.
    pub fn replace_document(&mut self, content: impl Into<String>) -> Result<u64, SessionError> {
        self.editable()?;
        self.revision += 1;
        let Some(document) = self.document.as_mut() else {
            return Err(SessionError::NoDocument);
        };
        document.replace(content.into(), self.revision);
        if self.state == SessionState::Ready {
            self.state = SessionState::Dirty;
        }
        self.publish();
        Ok(self.revision)
    }

    /// Replace the content with the user's edit and report whether it is
    /// valid JSON. Validity never changes the session state.
    pub fn edit(&mut self, content: impl Into<String>) -> Result<&ValidationResult, SessionError> {
        self.replace_document(content)?;
        self.document
            .as_ref()
            .map(EditableDocument::validation)
            .ok_or(SessionError::NoDocument)
    }

    /// Pretty-print the content if it is valid JSON. Returns whether the
    /// content changed; invalid content is left as is.
    pub fn format(&mut self) -> Result<bool, SessionError> {
        let document = self.editable()?;
        let validation = document.validation();
        if let Some(error) = validation.error() {
            return Err(SessionError::Invalid(error.clone()));
        }
        let Some(formatted) = validation.formatted() else {
            return Ok(false);
        };
        if formatted == document.content() {
            return Ok(false);
        }
        let formatted = formatted.to_string();
        self.replace_document(formatted)?;
        Ok(true)
    }

    /// Snapshot the content for writing. The document's path goes through the
    /// guard again before anything is written.
    pub fn begin_save(&mut self) -> Result<SaveRequest, SessionError> {
        match self.state {
            SessionState::Idle => return Err(SessionError::NoDocument),
            SessionState::Loading => return Err(SessionError::Busy),
            SessionState::Saving => return Err(SessionError::SaveInProgress),
            SessionState::Ready | SessionState::Dirty => {}
        }
        let document = self.editable()?;
        self.workspace.resolve(document.path())?;

        if self.settings.format_on_save && document.is_valid() {
            self.format()?;
        }

        let document = self.editable()?;
        if let Some(error) = document.last_error() {
            tracing::warn!(path = %document.path(), %error, "saving content that is not valid JSON");
        }
        let request = SaveRequest {
            generation: self.document_generation,
            path: document.path().to_string(),
            content: document.content().to_string(),
            expected: self
                .settings
                .detect_conflicts
                .then(|| document.fingerprint()),
        };
        self.saving = Some(self.document_generation);
        self.state = SessionState::Saving;
        tracing::debug!(path = %request.path, bytes = request.content.len(), "saving");
        Ok(request)
    }

    pub fn complete_save(&mut self, response: SaveResponse) -> Result<SaveOutcome, SessionError> {
        if self.saving != Some(response.generation) {
            tracing::debug!(generation = response.generation, "discarding stale save");
            return Ok(SaveOutcome::Stale);
        }
        self.saving = None;
        let Some(document) = self.document.as_mut() else {
            return Ok(SaveOutcome::Stale);
        };

        let (next, result) = match response.result {
            Ok(fingerprint) => {
                document.set_fingerprint(fingerprint);
                if document.content() == response.content {
                    (SessionState::Ready, Ok(SaveOutcome::Saved))
                } else {
                    (SessionState::Dirty, Ok(SaveOutcome::Superseded))
                }
            }
            Err(err) => {
                tracing::warn!(path = %document.path(), %err, "save failed");
                (SessionState::Dirty, Err(err.into()))
            }
        };

        // A selection made during the save decides the visible state; the
        // save outcome only applies if that load fails.
        if self.state == SessionState::Loading {
            self.resume = next;
        } else {
            self.state = next;
        }
        result
    }

    /// Snapshot, write and apply in one step.
    pub async fn save(&mut self) -> Result<SaveOutcome, SessionError> {
        let request = self.begin_save()?;
        let response = request.run(&self.workspace).await;
        self.complete_save(response)
    }

    /// Drop the open document. Outstanding loads and saves become stale.
    pub fn close(&mut self) {
        self.generation += 1;
        self.document = None;
        self.saving = None;
        self.state = SessionState::Idle;
        self.resume = SessionState::Idle;
        self.publish();
    }

    fn editable(&self) -> Result<&EditableDocument, SessionError> {
        match self.state {
            SessionState::Idle => Err(SessionError::NoDocument),
            SessionState::Loading => Err(SessionError::Busy),
            SessionState::Ready | SessionState::Dirty | SessionState::Saving => {
                self.document.as_ref().ok_or(SessionError::NoDocument)
            }
        }
    }

    fn publish(&self) {
        self.updates
            .send_replace(self.document.as_ref().map(EditableDocument::snapshot));
    }
}
