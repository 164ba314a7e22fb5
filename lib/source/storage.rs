//! Byte storage backends the PEM files are read from.

use std::{
    collections::HashMap,
    fmt, fs,
    io::{self, Cursor, Read},
    path::{Path, PathBuf},
    sync::RwLock,
};

/// Read-only access to named byte blobs.
///
/// Implementations are shared between concurrent credential builds and must
/// tolerate parallel `open` calls.
pub trait Storage: Send + Sync + fmt::Debug {
    /// Open `path` for reading
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send + '_>>;
}

/// Open `path` through `storage` and read it to completion.
///
/// Either the whole content is returned or an error, never a prefix.
pub fn read_all(storage: &dyn Storage, path: &Path) -> io::Result<Vec<u8>> {
    let mut reader = storage.open(path)?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(data)
}

/// The local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct OsStorage;

impl Storage for OsStorage {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send + '_>> {
        let file = fs::File::open(path)?;
        Ok(Box::new(io::BufReader::new(file)))
    }
}

/// An in-memory map of paths to contents.
///
/// Entries can be replaced at any time, which makes it suitable for tests and
/// for material fetched from somewhere other than disk.
#[derive(Default)]
pub struct MemStorage {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `path`, replacing any previous content
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        let mut files = self
            .files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        files.insert(path.into(), data.into());
    }

    /// Drop the entry for `path`, returning its content if it existed
    pub fn remove(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let mut files = self
            .files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        files.remove(path.as_ref())
    }
}

impl fmt::Debug for MemStorage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Key material stays out of debug output.
        let files = self
            .files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f.debug_struct("MemStorage")
            .field("paths", &files.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Storage for MemStorage {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send + '_>> {
        let files = self
            .files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let data = files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })?;
        Ok(Box::new(Cursor::new(data)))
    }
}
