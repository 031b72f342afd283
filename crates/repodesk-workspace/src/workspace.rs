//! Transport-facing file operations.
//!
//! [`Workspace`] is what a front end (the CLI, or an HTTP layer) talks to. It
//! takes caller-supplied path strings, runs them through the guard, and only
//! then lists, reads or writes.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use repodesk_conf::WalkSettings;

use crate::error::PathError;
use crate::error::WorkspaceError;
use crate::guard::WorkspaceRoot;
use crate::store::ContentStore;
use crate::store::Fingerprint;
use crate::walk::list_tree;
use crate::walk::Listing;
use crate::walk::WalkOptions;

impl From<&WalkSettings> for WalkOptions {
    fn from(settings: &WalkSettings) -> Self {
        Self {
            hidden: settings.hidden,
            globs: settings.globs.clone(),
            no_ignore: settings.no_ignore,
            follow_links: settings.follow_links,
            max_depth: settings.max_depth,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Workspace {
    root: WorkspaceRoot,
    store: ContentStore,
    walk: WalkOptions,
}

impl Workspace {
    #[must_use]
    pub fn new(root: WorkspaceRoot, walk: WalkOptions) -> Self {
        Self {
            root,
            store: ContentStore::new(),
            walk,
        }
    }

    #[must_use]
    pub fn root(&self) -> &WorkspaceRoot {
        &self.root
    }

    pub fn resolve(&self, requested: &str) -> Result<Utf8PathBuf, PathError> {
        self.root.resolve(requested)
    }

    /// Root-relative display form of a resolved path.
    #[must_use]
    pub fn display_path(&self, absolute: &Utf8Path) -> String {
        self.root
            .relative_path(absolute)
            .unwrap_or_else(|| absolute.to_string())
    }

    #[tracing::instrument(skip(self), fields(root = %self.root.as_path()))]
    pub async fn list(&self, requested: &str) -> Result<Listing, WorkspaceError> {
        let dir = self.resolve(requested)?;
        let listing = list_tree(dir, self.root.clone(), self.walk.clone()).await?;
        Ok(listing)
    }

    #[tracing::instrument(skip(self), fields(root = %self.root.as_path()))]
    pub async fn read(&self, requested: &str) -> Result<String, WorkspaceError> {
        let path = self.resolve(requested)?;
        Ok(self.store.read_file(&path).await?)
    }

    #[tracing::instrument(skip(self, content), fields(root = %self.root.as_path(), bytes = content.len()))]
    pub async fn write(&self, requested: &str, content: &str) -> Result<(), WorkspaceError> {
        let path = self.resolve(requested)?;
        Ok(self.store.write_file(&path, content).await?)
    }

    /// Write only if the file still has the `expected` fingerprint. Returns
    /// the fingerprint of what was written.
    #[tracing::instrument(skip(self, content), fields(root = %self.root.as_path(), bytes = content.len()))]
    pub async fn write_checked(
        &self,
        requested: &str,
        content: &str,
        expected: Fingerprint,
    ) -> Result<Fingerprint, WorkspaceError> {
        let path = self.resolve(requested)?;
        Ok(self
            .store
            .write_file_checked(&path, content, expected)
            .await?)
    }
}
