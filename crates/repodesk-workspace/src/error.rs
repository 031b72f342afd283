use std::io;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use thiserror::Error;

/// A requested path the guard refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("malformed path {path:?}: {reason}")]
    Malformed { path: String, reason: &'static str },
    #[error("path {path:?} resolves outside the workspace")]
    OutsideWorkspace { path: String },
}

/// A filesystem failure, classified the way the editor reports it.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("{path}: not found")]
    NotFound { path: Utf8PathBuf },
    #[error("{path}: permission denied")]
    PermissionDenied { path: Utf8PathBuf },
    #[error("{path}: is a directory")]
    IsADirectory { path: Utf8PathBuf },
    #[error("{path}: not a directory")]
    NotADirectory { path: Utf8PathBuf },
    #[error("{path}: changed on disk since it was loaded")]
    Conflict { path: Utf8PathBuf },
    #[error("{path}: {source}")]
    Other {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

impl IoError {
    pub(crate) fn from_io(path: &Utf8Path, err: io::Error) -> Self {
        let path = path.to_owned();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            io::ErrorKind::IsADirectory => Self::IsADirectory { path },
            io::ErrorKind::NotADirectory => Self::NotADirectory { path },
            _ => Self::Other { path, source: err },
        }
    }

    pub(crate) fn join(path: &Utf8Path, err: tokio::task::JoinError) -> Self {
        Self::Other {
            path: path.to_owned(),
            source: io::Error::other(err),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::NotFound { path }
            | Self::PermissionDenied { path }
            | Self::IsADirectory { path }
            | Self::NotADirectory { path }
            | Self::Conflict { path }
            | Self::Other { path, .. } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Io(#[from] IoError),
}
