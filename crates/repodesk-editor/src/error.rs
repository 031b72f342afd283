use repodesk_json::ValidationError;
use repodesk_workspace::IoError;
use repodesk_workspace::PathError;
use repodesk_workspace::WorkspaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("content is not valid JSON: {0}")]
    Invalid(#[from] ValidationError),
    #[error("no document is open")]
    NoDocument,
    #[error("a save is already in progress")]
    SaveInProgress,
    #[error("a document is still loading")]
    Busy,
}

impl From<WorkspaceError> for SessionError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::Path(err) => Self::Path(err),
            WorkspaceError::Io(err) => Self::Io(err),
        }
    }
}
