//! Path confinement for the workspace.
//!
//! [`resolve`] is the single check every disk operation goes through. It
//! normalizes the request lexically, resolves symbolic links on the part of
//! the path that exists, and verifies containment after both steps. A path
//! that merely lacks a literal `..` is not considered safe on that basis.

use camino::Utf8Component;
use camino::Utf8Path;
use camino::Utf8PathBuf;

use crate::error::IoError;
use crate::error::PathError;

/// The canonical directory that bounds every file operation of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkspaceRoot(Utf8PathBuf);

impl WorkspaceRoot {
    /// Canonicalize `path` and check that it is a directory.
    pub fn new(path: impl AsRef<Utf8Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let canonical = canonicalize_utf8(path).map_err(|err| IoError::from_io(path, err))?;
        if !canonical.is_dir() {
            return Err(IoError::NotADirectory { path: canonical });
        }
        Ok(Self(canonical))
    }

    #[must_use]
    pub fn as_path(&self) -> &Utf8Path {
        &self.0
    }

    pub fn resolve(&self, requested: &str) -> Result<Utf8PathBuf, PathError> {
        resolve(requested, self)
    }

    /// Forward-slash form of `absolute` relative to the root, or `None` when
    /// `absolute` is not below the root. The root itself is the empty string.
    #[must_use]
    pub fn relative_path(&self, absolute: &Utf8Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.0).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|component| component.as_str())
            .collect();
        Some(parts.join("/"))
    }

    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        path.starts_with(&self.0)
    }
}

impl AsRef<Utf8Path> for WorkspaceRoot {
    fn as_ref(&self) -> &Utf8Path {
        &self.0
    }
}

/// Resolve a caller-supplied path to an absolute path inside `root`.
///
/// Relative requests are taken relative to the root; absolute requests must
/// already point into it. Backslashes count as separators. The target does not
/// need to exist, so the result can be used to create new files.
pub fn resolve(requested: &str, root: &WorkspaceRoot) -> Result<Utf8PathBuf, PathError> {
    let malformed = |reason| PathError::Malformed {
        path: requested.to_string(),
        reason,
    };
    let outside = || PathError::OutsideWorkspace {
        path: requested.to_string(),
    };

    if requested.is_empty() {
        return Err(malformed("path is empty"));
    }
    if requested.contains('\0') {
        return Err(malformed("path contains a NUL byte"));
    }

    let unified = requested.replace('\\', "/");
    let candidate = Utf8Path::new(&unified);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.as_path().join(candidate)
    };

    let normalized = normalize(&joined);
    if !root.contains(&normalized) {
        tracing::debug!(%requested, %normalized, "rejected lexical escape");
        return Err(outside());
    }

    let resolved = match resolve_links(&normalized) {
        Ok(resolved) => resolved,
        Err(Unresolvable::NonUtf8) => return Err(malformed("path resolves to non-UTF-8 bytes")),
        Err(Unresolvable::DanglingLink) => {
            tracing::debug!(%requested, "rejected dangling symlink");
            return Err(outside());
        }
    };
    if !root.contains(&resolved) {
        tracing::debug!(%requested, %resolved, "rejected symlink escape");
        return Err(outside());
    }

    Ok(resolved)
}

/// Collapse `.` and `..` without touching the filesystem. `..` at the
/// filesystem root stays at the root.
fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut normalized = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::Prefix(_) | Utf8Component::RootDir | Utf8Component::Normal(_) => {
                normalized.push(component.as_str());
            }
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if matches!(
                    normalized.components().next_back(),
                    Some(Utf8Component::Normal(_))
                ) {
                    normalized.pop();
                }
            }
        }
    }
    normalized
}

enum Unresolvable {
    NonUtf8,
    DanglingLink,
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest.
fn resolve_links(path: &Utf8Path) -> Result<Utf8PathBuf, Unresolvable> {
    let mut existing = path;
    let mut missing: Vec<&str> = Vec::new();

    loop {
        if let Ok(canonical) = dunce::canonicalize(existing) {
            let mut resolved =
                Utf8PathBuf::from_path_buf(canonical).map_err(|_| Unresolvable::NonUtf8)?;
            for name in missing.iter().rev() {
                resolved.push(name);
            }
            return Ok(resolved);
        }

        // Exists but cannot be canonicalized: a symlink whose target is gone.
        if existing.symlink_metadata().is_ok_and(|meta| meta.is_symlink()) {
            return Err(Unresolvable::DanglingLink);
        }

        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return Ok(path.to_path_buf()),
        }
    }
}

pub(crate) fn canonicalize_utf8(path: &Utf8Path) -> std::io::Result<Utf8PathBuf> {
    let canonical = dunce::canonicalize(path)?;
    Utf8PathBuf::from_path_buf(canonical)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "non-UTF-8 path"))
}
