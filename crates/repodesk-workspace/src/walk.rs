use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use ignore::overrides::OverrideBuilder;
use ignore::DirEntry;
use ignore::WalkBuilder;
use serde::Serialize;

use crate::error::IoError;
use crate::guard::WorkspaceRoot;

/// Options controlling how [`list_tree`] traverses directories.
///
/// All options map directly to methods on the `ignore` crate's `WalkBuilder`.
/// The defaults list every entry; hiding dotfiles and honouring ignore files
/// are opt-in.
#[derive(Clone, Debug)]
pub struct WalkOptions {
    /// Include hidden files and directories (those starting with `.`).
    pub hidden: bool,
    /// Gitignore-style glob patterns. Prefix with `!` to exclude.
    /// Later patterns take precedence over earlier ones.
    pub globs: Vec<String>,
    /// Disable all ignore files (`.gitignore`, `.ignore`, etc.).
    pub no_ignore: bool,
    /// Descend into symbolic links. Links are never followed out of the root.
    pub follow_links: bool,
    /// Maximum directory recursion depth. `None` means unlimited.
    pub max_depth: Option<usize>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            hidden: true,
            globs: Vec::new(),
            no_ignore: true,
            follow_links: false,
            max_depth: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One listed file or directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    /// Relative to the workspace root, `/`-separated.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileEntry {
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    fn has_extension(&self, extensions: &[String]) -> bool {
        Utf8Path::new(&self.name)
            .extension()
            .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
    }
}

/// An entry the walk left out, or listed with incomplete information.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntryWarning {
    pub path: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Depth-first, each directory before its children, siblings by name.
    pub entries: Vec<FileEntry>,
    pub warnings: Vec<EntryWarning>,
}

impl Listing {
    /// Keep only files whose extension is one of `extensions`, compared
    /// case-insensitively. Warnings are kept.
    #[must_use]
    pub fn editable_files(mut self, extensions: &[String]) -> Self {
        self.entries
            .retain(|entry| entry.is_file() && entry.has_extension(extensions));
        self
    }
}

/// List everything below `dir` on tokio's blocking pool.
///
/// `dir` must already have passed [`crate::guard::resolve`].
pub async fn list_tree(
    dir: Utf8PathBuf,
    root: WorkspaceRoot,
    options: WalkOptions,
) -> Result<Listing, IoError> {
    let task_dir = dir.clone();
    tokio::task::spawn_blocking(move || walk_tree(&task_dir, &root, &options))
        .await
        .map_err(|err| IoError::join(&dir, err))?
}

/// Walk `dir` recursively and describe every entry below it.
///
/// Failures on `dir` itself are returned as errors. Anything that goes wrong
/// further down is recorded in [`Listing::warnings`] and the walk continues.
/// Symbolic links whose target lies outside `root` are never listed.
pub(crate) fn walk_tree(
    dir: &Utf8Path,
    root: &WorkspaceRoot,
    options: &WalkOptions,
) -> Result<Listing, IoError> {
    let metadata = std::fs::metadata(dir).map_err(|err| IoError::from_io(dir, err))?;
    if !metadata.is_dir() {
        return Err(IoError::NotADirectory {
            path: dir.to_owned(),
        });
    }
    // Surfaces permission problems on the root instead of as a warning.
    std::fs::read_dir(dir).map_err(|err| IoError::from_io(dir, err))?;

    let warnings = Arc::new(Mutex::new(Vec::new()));

    let mut builder = WalkBuilder::new(dir.as_std_path());
    // Call standard_filters first, then override individual settings. Ignore
    // files above the root and the user's global excludes never apply.
    builder
        .standard_filters(!options.no_ignore)
        .parents(false)
        .git_global(false)
        .hidden(!options.hidden)
        .follow_links(options.follow_links)
        .sort_by_file_name(|a, b| a.cmp(b));

    if let Some(depth) = options.max_depth {
        builder.max_depth(Some(depth));
    }

    if !options.globs.is_empty() {
        let mut overrides = OverrideBuilder::new(dir.as_std_path());
        for glob in &options.globs {
            if let Err(err) = overrides.add(glob) {
                tracing::warn!(%glob, %err, "ignoring invalid glob");
            }
        }
        match overrides.build() {
            Ok(built) => {
                builder.overrides(built);
            }
            Err(err) => tracing::warn!(%err, "ignoring glob overrides"),
        }
    }

    {
        let root = root.clone();
        let warnings = Arc::clone(&warnings);
        builder.filter_entry(move |entry| keep_link(entry, &root, &warnings));
    }

    let mut entries = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                let path = error_path(&err)
                    .map_or_else(|| dir.to_string(), |path| display_path(path, root));
                tracing::warn!(%path, %err, "skipping entry");
                record(&warnings, path, describe(&err));
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        if let Some(file_entry) = describe_entry(&entry, root, &warnings) {
            entries.push(file_entry);
        }
    }

    let mut warnings =
        std::mem::take(&mut *warnings.lock().unwrap_or_else(PoisonError::into_inner));
    warnings.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::debug!(
        %dir,
        entries = entries.len(),
        warnings = warnings.len(),
        "walked directory"
    );
    Ok(Listing { entries, warnings })
}

fn describe_entry(
    entry: &DirEntry,
    root: &WorkspaceRoot,
    warnings: &Mutex<Vec<EntryWarning>>,
) -> Option<FileEntry> {
    let path = display_path(entry.path(), root);
    let Some(name) = entry.file_name().to_str().map(str::to_string) else {
        record(warnings, path, "file name is not valid UTF-8".to_string());
        return None;
    };

    let file_type = entry.file_type()?;
    let is_dir = if file_type.is_symlink() {
        // An unfollowed link: report what it points at, but do not descend.
        match std::fs::metadata(entry.path()) {
            Ok(target) => target.is_dir(),
            Err(err) => {
                record(warnings, path, err.to_string());
                return None;
            }
        }
    } else {
        file_type.is_dir()
    };

    if is_dir {
        return Some(FileEntry {
            name,
            path,
            kind: EntryKind::Directory,
            size: None,
        });
    }

    let size = match std::fs::metadata(entry.path()) {
        Ok(metadata) => Some(metadata.len()),
        Err(err) => {
            record(warnings, path.clone(), format!("size unavailable: {err}"));
            None
        }
    };
    Some(FileEntry {
        name,
        path,
        kind: EntryKind::File,
        size,
    })
}

/// Entry filter: every symbolic link must resolve to somewhere inside the
/// root, whether or not it is followed.
fn keep_link(entry: &DirEntry, root: &WorkspaceRoot, warnings: &Mutex<Vec<EntryWarning>>) -> bool {
    if !entry.path_is_symlink() {
        return true;
    }
    let reason = match dunce::canonicalize(entry.path()) {
        Ok(target) => match Utf8Path::from_path(&target) {
            Some(target) if root.contains(target) => return true,
            _ => "symbolic link points outside the workspace",
        },
        Err(_) => "symbolic link target does not exist",
    };
    let path = display_path(entry.path(), root);
    tracing::warn!(%path, reason, "skipping entry");
    record(warnings, path, reason.to_string());
    false
}

fn record(warnings: &Mutex<Vec<EntryWarning>>, path: String, reason: String) {
    warnings
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(EntryWarning { path, reason });
}

fn display_path(path: &Path, root: &WorkspaceRoot) -> String {
    Utf8Path::from_path(path)
        .and_then(|path| root.relative_path(path))
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::Loop { child, .. } => Some(child),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

fn describe(err: &ignore::Error) -> String {
    match err {
        ignore::Error::WithPath { err, .. }
        | ignore::Error::WithDepth { err, .. }
        | ignore::Error::WithLineNumber { err, .. } => describe(err),
        ignore::Error::Loop { .. } => "symbolic link loop".to_string(),
        other => other.to_string(),
    }
}
