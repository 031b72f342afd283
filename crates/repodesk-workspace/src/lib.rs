//! Sandboxed access to the files of one workspace directory.
//!
//! Every operation that touches disk goes through [`guard::resolve`] first, so
//! nothing outside the [`WorkspaceRoot`] can be listed, read or written, even
//! through symbolic links.

mod error;
pub mod guard;
mod store;
mod walk;
mod workspace;

pub use error::IoError;
pub use error::PathError;
pub use error::WorkspaceError;
pub use guard::WorkspaceRoot;
pub use store::ContentStore;
pub use store::Fingerprint;
pub use walk::list_tree;
pub use walk::EntryKind;
pub use walk::EntryWarning;
pub use walk::FileEntry;
pub use walk::Listing;
pub use walk::WalkOptions;
pub use workspace::Workspace;
