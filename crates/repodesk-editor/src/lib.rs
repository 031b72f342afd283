//! The single-document JSON editing session.
//!
//! An [`EditorSession`] owns at most one [`EditableDocument`] and moves it
//! through load, edit and save. Disk I/O is split into request/response pairs
//! ([`LoadRequest`], [`SaveRequest`]) so a front end can run it wherever it
//! likes and hand the result back; loads that were superseded by a newer
//! selection are discarded when they complete.

mod document;
mod error;
mod session;

pub use document::DocumentSnapshot;
pub use document::EditableDocument;
pub use error::SessionError;
pub use session::EditorSession;
pub use session::LoadOutcome;
pub use session::LoadRequest;
pub use session::LoadResponse;
pub use session::SaveOutcome;
pub use session::SaveRequest;
pub use session::SaveResponse;
pub use session::SessionState;
