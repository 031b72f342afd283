use std::fmt;
use std::io::Write;
use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use dashmap::DashMap;
use sha2::Digest;
use sha2::Sha256;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::error::IoError;

/// SHA-256 of a file's bytes, used to notice on-disk changes between a load
/// and a save.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    #[must_use]
    pub fn of(content: &[u8]) -> Self {
        let mut bytes = [0; 32];
        bytes.copy_from_slice(&Sha256::digest(content));
        Self(bytes)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// Reads and atomically writes file content.
///
/// Paths handed to the store must already be guarded. Writes to the same path
/// queue on a per-path lock; writes to different paths proceed independently.
/// Cloning shares the lock table.
#[derive(Clone, Debug, Default)]
pub struct ContentStore {
    locks: Arc<DashMap<Utf8PathBuf, Arc<Mutex<()>>>>,
}

impl ContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read_file(&self, path: &Utf8Path) -> Result<String, IoError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|err| IoError::from_io(path, err))?;
        if metadata.is_dir() {
            return Err(IoError::IsADirectory {
                path: path.to_owned(),
            });
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| IoError::from_io(path, err))?;
        tracing::debug!(%path, bytes = content.len(), "read file");
        Ok(content)
    }

    /// Replace the file at `path` with exactly `content`.
    ///
    /// The path lock travels with the blocking write, so dropping this future
    /// early never lets another write to `path` start before this one lands.
    pub async fn write_file(&self, path: &Utf8Path, content: &str) -> Result<(), IoError> {
        let held = self.acquire(path).await;
        let target = path.to_owned();
        let bytes = content.as_bytes().to_vec();
        blocking(path, move || {
            let _held = held;
            StagedWrite::stage(&target, &bytes)?.commit()
        })
        .await?;
        tracing::debug!(%path, bytes = content.len(), "wrote file");
        Ok(())
    }

    /// Like [`ContentStore::write_file`], but fails with
    /// [`IoError::Conflict`] unless the file on disk still has the
    /// `expected` fingerprint. Returns the fingerprint of the new content.
    pub async fn write_file_checked(
        &self,
        path: &Utf8Path,
        content: &str,
        expected: Fingerprint,
    ) -> Result<Fingerprint, IoError> {
        let held = self.acquire(path).await;
        let target = path.to_owned();
        let bytes = content.as_bytes().to_vec();
        blocking(path, move || {
            let _held = held;
            let on_disk = match std::fs::read(&target) {
                Ok(current) => Some(Fingerprint::of(&current)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
                Err(err) => return Err(IoError::from_io(&target, err)),
            };
            if on_disk != Some(expected) {
                tracing::warn!(path = %target, %expected, "file changed on disk since load");
                return Err(IoError::Conflict { path: target });
            }
            StagedWrite::stage(&target, &bytes)?.commit()?;
            Ok(Fingerprint::of(&bytes))
        })
        .await
    }

    /// Wait for exclusive use of `path`. The returned [`PathLock`] releases it
    /// on drop.
    async fn acquire(&self, path: &Utf8Path) -> PathLock {
        let lock = Arc::clone(self.locks.entry(path.to_owned()).or_default().value());
        let mut held = PathLock {
            locks: Arc::clone(&self.locks),
            path: path.to_owned(),
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }
}

/// Exclusive use of one path in a [`ContentStore`]'s lock table.
struct PathLock {
    locks: Arc<DashMap<Utf8PathBuf, Arc<Mutex<()>>>>,
    path: Utf8PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PathLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the table's own reference left: nobody is waiting on this path.
        self.locks
            .remove_if(&self.path, |_, lock| Arc::strong_count(lock) == 1);
    }
}

async fn blocking<T, F>(path: &Utf8Path, task: F) -> Result<T, IoError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, IoError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| IoError::join(path, err))?
}

/// New file content written to a temporary sibling of its target, waiting to
/// be renamed into place.
///
/// Dropping a `StagedWrite` without committing removes the temporary file and
/// leaves the target untouched.
#[derive(Debug)]
pub(crate) struct StagedWrite {
    target: Utf8PathBuf,
    file: NamedTempFile,
}

impl StagedWrite {
    /// Write and fsync `bytes` next to `target`. The target's permissions are
    /// carried over when it already exists.
    pub(crate) fn stage(target: &Utf8Path, bytes: &[u8]) -> Result<Self, IoError> {
        let is_a_directory = || IoError::IsADirectory {
            path: target.to_owned(),
        };
        if target.is_dir() {
            return Err(is_a_directory());
        }
        let (Some(parent), Some(name)) = (target.parent(), target.file_name()) else {
            return Err(is_a_directory());
        };
        let io = |err: std::io::Error| IoError::from_io(target, err);

        let mut file = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(io)?;
        file.write_all(bytes).map_err(io)?;
        file.as_file().sync_all().map_err(io)?;

        match std::fs::metadata(target) {
            Ok(existing) => file
                .as_file()
                .set_permissions(existing.permissions())
                .map_err(io)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(io(err)),
        }

        Ok(Self {
            target: target.to_owned(),
            file,
        })
    }

    /// Location of the staged bytes.
    #[cfg(test)]
    fn staged_path(&self) -> &std::path::Path {
        self.file.path()
    }

    /// Atomically rename the staged file over the target.
    pub(crate) fn commit(self) -> Result<(), IoError> {
        let Self { target, file } = self;
        file.persist(&target)
            .map_err(|err| IoError::from_io(&target, err.error))?;
        sync_parent(&target);
        Ok(())
    }
}

#[cfg(unix)]
fn sync_parent(target: &Utf8Path) {
    let Some(parent) = target.parent() else {
        return;
    };
    if let Err(err) = std::fs::File::open(parent).and_then(|dir| dir.sync_all()) {
        tracing::debug!(%parent, %err, "could not fsync directory");
    }
}

#[cfg(not(unix))]
fn sync_parent(_target: &Utf8Path) {}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    fn dir_names(dir: &Utf8Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            Fingerprint::of(b"").to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(Fingerprint::of(b"{}"), Fingerprint::of(b"[]"));
    }

    #[tokio::test]
    async fn write_then_read_returns_exact_bytes() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        let path = base.join("data.json");
        let content = "{\"a\":1}\r\n  \u{00e9}\t";

        store.write_file(&path, content).await.unwrap();
        assert_eq!(store.read_file(&path).await.unwrap(), content);
        assert_eq!(dir_names(&base), ["data.json"]);
    }

    #[tokio::test]
    async fn write_replaces_existing_content() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        let path = base.join("data.json");
        std::fs::write(&path, "a much longer original body").unwrap();

        store.write_file(&path, "[]").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn read_classifies_errors() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();

        assert!(matches!(
            store.read_file(&base.join("missing.json")).await,
            Err(IoError::NotFound { .. })
        ));
        assert!(matches!(
            store.read_file(&base).await,
            Err(IoError::IsADirectory { .. })
        ));

        let binary = base.join("blob.bin");
        std::fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            store.read_file(&binary).await,
            Err(IoError::Other { .. })
        ));
    }

    #[tokio::test]
    async fn write_to_directory_fails() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        std::fs::create_dir(base.join("sub")).unwrap();

        assert!(matches!(
            store.write_file(&base.join("sub"), "{}").await,
            Err(IoError::IsADirectory { .. })
        ));
    }

    #[tokio::test]
    async fn write_into_missing_directory_is_not_found() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        assert!(matches!(
            store.write_file(&base.join("nope/new.json"), "{}").await,
            Err(IoError::NotFound { .. })
        ));
    }

    #[test]
    fn dropped_staged_write_leaves_original_intact() {
        let (_dir, base) = scratch();
        let target = base.join("config.json");
        std::fs::write(&target, "{\"version\": 1}").unwrap();

        let staged = StagedWrite::stage(&target, b"{\"version\": 2}").unwrap();
        let staged_path = staged.staged_path().to_path_buf();
        assert_eq!(staged_path.parent(), Some(base.as_std_path()));
        assert_eq!(std::fs::read(&staged_path).unwrap(), b"{\"version\": 2}");

        // Interrupted before the rename.
        drop(staged);

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"version\": 1}");
        assert!(!staged_path.exists());
        assert_eq!(dir_names(&base), ["config.json"]);
    }

    #[test]
    fn committed_staged_write_replaces_target() {
        let (_dir, base) = scratch();
        let target = base.join("config.json");
        std::fs::write(&target, "old").unwrap();

        StagedWrite::stage(&target, b"new").unwrap().commit().unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        assert_eq!(dir_names(&base), ["config.json"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, base) = scratch();
        let path = base.join("mode.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        ContentStore::new().write_file(&path, "[]").await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[tokio::test]
    async fn writes_to_one_path_queue_behind_the_lock() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        let path = base.join("queued.json");

        let held = store.acquire(&path).await;

        let task = {
            let store = store.clone();
            let path = path.clone();
            tokio::spawn(async move { store.write_file(&path, "{}").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!path.exists(), "write must wait for the path lock");

        drop(held);
        task.await.unwrap().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(store.locks.is_empty(), "lock entry is released");
    }

    #[tokio::test]
    async fn concurrent_writes_never_interleave() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        let path = base.join("race.json");

        let bodies: Vec<String> = (0..16)
            .map(|i| format!("{{\"writer\": {i}, \"pad\": \"{}\"}}", "x".repeat(4096 * i)))
            .collect();
        let tasks: Vec<_> = bodies
            .iter()
            .cloned()
            .map(|body| {
                let store = store.clone();
                let path = path.clone();
                tokio::spawn(async move { store.write_file(&path, &body).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let final_content = std::fs::read_to_string(&path).unwrap();
        assert!(bodies.contains(&final_content));
        assert_eq!(dir_names(&base), ["race.json"]);
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn checked_write_detects_external_change() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        let path = base.join("shared.json");
        std::fs::write(&path, "{\"v\": 1}").unwrap();
        let loaded = Fingerprint::of(b"{\"v\": 1}");

        std::fs::write(&path, "{\"v\": \"external\"}").unwrap();
        assert!(matches!(
            store.write_file_checked(&path, "{\"v\": 2}", loaded).await,
            Err(IoError::Conflict { .. })
        ));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"v\": \"external\"}"
        );
    }

    #[tokio::test]
    async fn checked_write_succeeds_and_returns_new_fingerprint() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        let path = base.join("shared.json");
        std::fs::write(&path, "[1]").unwrap();

        let next = store
            .write_file_checked(&path, "[2]", Fingerprint::of(b"[1]"))
            .await
            .unwrap();
        assert_eq!(next, Fingerprint::of(b"[2]"));

        let after = store
            .write_file_checked(&path, "[3]", next)
            .await
            .unwrap();
        assert_eq!(after, Fingerprint::of(b"[3]"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[3]");
    }

    #[tokio::test]
    async fn checked_write_of_deleted_file_conflicts() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        let path = base.join("gone.json");
        assert!(matches!(
            store
                .write_file_checked(&path, "{}", Fingerprint::of(b"{}"))
                .await,
            Err(IoError::Conflict { .. })
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn cancelled_write_keeps_path_locked_until_it_lands() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        let path = base.join("slow.json");
        std::fs::write(&path, "old").unwrap();

        // Polled once: the lock is taken and the blocking write is spawned,
        // then the caller gives up on it.
        let first = store.write_file(&path, "first");
        let _ = tokio::time::timeout(Duration::ZERO, first).await;

        let lock = store.locks.get(&path).map(|entry| Arc::clone(entry.value()));
        let still_held = lock.as_ref().is_some_and(|lock| lock.try_lock().is_err());
        drop(lock);
        if !still_held {
            assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");
        }

        store.write_file(&path, "second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(dir_names(&base), ["slow.json"]);
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn failed_write_releases_the_path() {
        let (_dir, base) = scratch();
        let store = ContentStore::new();
        let path = base.join("missing/new.json");

        assert!(store.write_file(&path, "{}").await.is_err());
        assert!(store.locks.is_empty());
    }
}
