//! File-based storage backend for persistent storage.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::backend::{KeyIter, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::namespace::validate_namespace;

/// Maximum key length declared by the file backend (one path component).
const FILE_MAX_KEY_LEN: usize = 255;

/// Directory under the root holding in-flight writes.
///
/// Namespace names cannot start with `.`, so this never collides with one.
const STAGING_DIR: &str = ".staging";

/// Prefix marking an escaped `.` or `..` key segment on disk.
///
/// `;` never appears in a valid key, so escaped names cannot collide.
const SEGMENT_ESCAPE: char = ';';

/// Options controlling how a [`FileBackend`] provisions its namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Create the namespace directory on first use if it is missing.
    pub create_if_missing: bool,

    /// Make a created namespace directory world-readable (Unix only).
    pub public: bool,
}

/// A file-based storage backend.
///
/// Each value is one file at `{root}/{namespace}/{key}`. Keys containing
/// `/` map onto nested directories. The segments `.` and `..` are stored as
/// `;.` and `;..` so every valid key has its own file.
///
/// # Durability
///
/// Writes go to a staging file that is synced and then renamed into place,
/// so readers observe either the old value or the new one, never a prefix.
///
/// # Namespace provisioning
///
/// Opening a backend performs no I/O. The namespace directory is checked on
/// first use; if it is missing it is created when
/// [`FileOptions::create_if_missing`] is set, otherwise every operation
/// fails with [`StorageError::NamespaceMissing`].
///
/// # Example
///
/// ```no_run
/// use stowage_storage::{FileBackend, FileOptions, StorageBackend};
/// use std::path::Path;
///
/// let options = FileOptions { create_if_missing: true, public: false };
/// let backend = FileBackend::open(Path::new("data"), "blobs", options).unwrap();
/// backend.put("report.csv", b"a,b,c").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    namespace: String,
    options: FileOptions,
    dir: PathBuf,
    provisioned: AtomicBool,
    provision_lock: Mutex<()>,
    /// Held shared while creating a parent directory and renaming into it,
    /// exclusively while pruning empty directories.
    tree_lock: RwLock<()>,
}

impl FileBackend {
    /// Creates a backend for `namespace` under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if the namespace name is invalid.
    pub fn open(root: &Path, namespace: &str, options: FileOptions) -> StorageResult<Self> {
        validate_namespace(namespace)?;
        Ok(Self {
            root: root.to_path_buf(),
            namespace: namespace.to_string(),
            options,
            dir: root.join(namespace),
            provisioned: AtomicBool::new(false),
            provision_lock: Mutex::new(()),
            tree_lock: RwLock::new(()),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the namespace name.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the provisioning options.
    #[must_use]
    pub fn options(&self) -> FileOptions {
        self.options
    }

    /// Returns the directory holding this namespace's values.
    #[must_use]
    pub fn namespace_dir(&self) -> &Path {
        &self.dir
    }

    /// Makes sure the namespace directory exists, creating it if allowed.
    fn ensure_namespace(&self) -> StorageResult<&Path> {
        if self.provisioned.load(Ordering::Acquire) {
            return Ok(&self.dir);
        }

        let _guard = self.provision_lock.lock();
        if self.provisioned.load(Ordering::Acquire) {
            return Ok(&self.dir);
        }

        if !self.dir.is_dir() {
            if !self.options.create_if_missing {
                return Err(StorageError::NamespaceMissing {
                    namespace: self.namespace.clone(),
                });
            }
            fs::create_dir_all(&self.dir)?;
            set_namespace_permissions(&self.dir, self.options.public)?;
            debug!(
                namespace = %self.namespace,
                public = self.options.public,
                "created namespace directory {:?}",
                self.dir
            );
        }

        self.provisioned.store(true, Ordering::Release);
        Ok(&self.dir)
    }

    /// Maps a key onto its file path inside the namespace. No I/O.
    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let mut path = self.dir.clone();
        for segment in key.split('/') {
            match segment {
                "" => return Err(StorageError::unsupported_key(key, "empty path segment")),
                "." | ".." => path.push(format!("{SEGMENT_ESCAPE}{segment}")),
                _ => path.push(segment),
            }
        }
        Ok(path)
    }

    /// Opens the file holding `key`, failing with `NotFound` if there is none.
    fn open_value(&self, key: &str) -> StorageResult<(File, u64)> {
        let path = self.path_for(key)?;
        self.ensure_namespace()?;
        let file = File::open(&path).map_err(|e| missing_or_io(key, &path, e))?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(StorageError::not_found(key));
        }
        Ok((file, metadata.len()))
    }

    /// Returns a fresh staging path for an in-flight write.
    fn staging_path(&self) -> StorageResult<PathBuf> {
        let staging = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging)?;
        Ok(staging.join(Uuid::new_v4().simple().to_string()))
    }

    /// Moves a fully written staging file to `dest`, cleaning up on failure.
    fn commit(&self, staged: &Path, dest: &Path) -> StorageResult<()> {
        let tree = self.tree_lock.read();
        let result = dest
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::rename(staged, dest));
        drop(tree);

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(staged) {
                warn!("failed to remove staging file {:?}: {}", staged, cleanup);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Removes empty directories between `path` and the namespace directory.
    fn prune_empty_parents(&self, path: &Path) {
        let dir = self.dir.as_path();
        let _tree = self.tree_lock.write();
        let mut current = path.parent();
        while let Some(parent) = current {
            if parent == dir || !parent.starts_with(dir) {
                break;
            }
            if fs::remove_dir(parent).is_err() {
                break;
            }
            current = parent.parent();
        }
    }
}

impl StorageBackend for FileBackend {
    fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        self.ensure_namespace()?;
        Ok(path.is_file())
    }

    fn size(&self, key: &str) -> StorageResult<u64> {
        let path = self.path_for(key)?;
        self.ensure_namespace()?;
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
            Ok(_) => Err(StorageError::not_found(key)),
            Err(e) => Err(missing_or_io(key, &path, e)),
        }
    }

    fn get_range(&self, key: &str, start: u64, len: usize) -> StorageResult<Vec<u8>> {
        let (mut file, size) = self.open_value(key)?;
        if start >= size || len == 0 {
            return Ok(Vec::new());
        }

        let available = size - start;
        let wanted = (len as u64).min(available);
        trace!(key, start, len = wanted, "file range fetch");

        file.seek(SeekFrom::Start(start))?;
        let mut buffer = Vec::with_capacity(usize::try_from(wanted).unwrap_or(0));
        file.take(wanted).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let (mut file, size) = self.open_value(key)?;
        let mut buffer = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        self.ensure_namespace()?;
        let staged = self.staging_path()?;

        let written = File::create(&staged).and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        });
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&staged) {
                warn!("failed to remove staging file {:?}: {}", staged, cleanup);
            }
            return Err(e.into());
        }

        self.commit(&staged, &path)?;
        trace!(key, bytes = data.len(), "file put");
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        self.ensure_namespace()?;
        match fs::remove_file(&path) {
            Ok(()) => {
                self.prune_empty_parents(&path);
                trace!(key, "file delete");
                Ok(())
            }
            // A directory standing at the key's path means no value is stored there.
            Err(_) if path.is_dir() => Ok(()),
            Err(e) => match missing_or_io(key, &path, e) {
                StorageError::NotFound { .. } => Ok(()),
                other => Err(other),
            },
        }
    }

    fn iter_keys(&self, prefix: Option<&str>) -> StorageResult<KeyIter> {
        let dir = self.ensure_namespace()?.to_path_buf();
        let prefix = prefix.unwrap_or("").to_string();

        // Only the subtree the prefix points into needs walking.
        let start = match prefix.rfind('/') {
            Some(i) => match self.path_for(&prefix[..i]) {
                Ok(path) => path,
                Err(_) => return Ok(Box::new(std::iter::empty())),
            },
            None => dir.clone(),
        };

        Ok(Box::new(KeyWalker {
            base: dir,
            pending: vec![start],
            current: None,
            prefix,
        }))
    }

    fn copy(&self, source: &str, dest: &str) -> StorageResult<()> {
        let src = self.path_for(source)?;
        let dst = self.path_for(dest)?;
        self.ensure_namespace()?;
        if !src.is_file() {
            return Err(StorageError::not_found(source));
        }

        let staged = self.staging_path()?;
        if let Err(e) = fs::copy(&src, &staged) {
            if let Err(cleanup) = fs::remove_file(&staged) {
                trace!("no staging file to remove {:?}: {}", staged, cleanup);
            }
            return Err(missing_or_io(source, &src, e));
        }
        self.commit(&staged, &dst)
    }

    fn rename(&self, source: &str, dest: &str) -> StorageResult<()> {
        let src = self.path_for(source)?;
        let dst = self.path_for(dest)?;
        self.ensure_namespace()?;
        if !src.is_file() {
            return Err(StorageError::not_found(source));
        }
        if src == dst {
            return Ok(());
        }

        {
            let _tree = self.tree_lock.read();
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(&src, &dst).map_err(|e| missing_or_io(source, &src, e))?;
        }
        self.prune_empty_parents(&src);
        Ok(())
    }

    fn max_key_len(&self) -> usize {
        FILE_MAX_KEY_LEN
    }
}

/// Classifies an I/O error on a key's path.
///
/// A missing file, or a file standing where a directory component is
/// expected, both mean the key is absent.
fn missing_or_io(key: &str, path: &Path, err: io::Error) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound || !path.exists() {
        StorageError::not_found(key)
    } else {
        StorageError::Io(err)
    }
}

/// Reverses the on-disk escaping of `.` and `..` segments.
fn unescape_segment(name: &str) -> &str {
    match name.strip_prefix(SEGMENT_ESCAPE) {
        Some(rest @ ("." | "..")) => rest,
        _ => name,
    }
}

#[cfg(unix)]
fn set_namespace_permissions(dir: &Path, public: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if public { 0o755 } else { 0o700 };
    fs::set_permissions(dir, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_namespace_permissions(_dir: &Path, _public: bool) -> io::Result<()> {
    Ok(())
}

/// Lazy depth-first walk over a namespace directory.
struct KeyWalker {
    base: PathBuf,
    pending: Vec<PathBuf>,
    current: Option<fs::ReadDir>,
    prefix: String,
}

impl KeyWalker {
    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base).ok()?;
        let segments = relative
            .components()
            .map(|c| c.as_os_str().to_str().map(unescape_segment))
            .collect::<Option<Vec<_>>>()?;
        Some(segments.join("/"))
    }
}

impl Iterator for KeyWalker {
    type Item = StorageResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let dir = self.pending.pop()?;
                match fs::read_dir(&dir) {
                    Ok(entries) => self.current = Some(entries),
                    // Removed since it was queued, or the prefix points nowhere.
                    Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(_) if !dir.is_dir() => continue,
                    Err(e) => return Some(Err(e.into())),
                }
            }

            let entry = match self.current.as_mut().and_then(Iterator::next) {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => return Some(Err(e.into())),
                None => {
                    self.current = None;
                    continue;
                }
            };

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => return Some(Err(e.into())),
            };
            let path = entry.path();
            if file_type.is_dir() {
                self.pending.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            match self.key_for(&path) {
                Some(key) if key.starts_with(&self.prefix) => return Some(Ok(key)),
                _ => continue,
            }
        }
    }
}
