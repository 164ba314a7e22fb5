//! PEM fixtures and storage helpers shared by the integration tests

#![allow(dead_code)]

use mtls_files::{MemStorage, Role, Storage, TlsCredentials, X509Files};
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

pub const CA: &[u8] = include_bytes!("../fixtures/ca.pem");
pub const ROGUE_CA: &[u8] = include_bytes!("../fixtures/rogue-ca.pem");
pub const SERVER_CERT: &[u8] = include_bytes!("../fixtures/server.pem");
pub const SERVER_KEY: &[u8] = include_bytes!("../fixtures/server.key");
pub const CLIENT_CERT: &[u8] = include_bytes!("../fixtures/client.pem");
pub const CLIENT_KEY: &[u8] = include_bytes!("../fixtures/client.key");
pub const CLIENT_SEC1_KEY: &[u8] = include_bytes!("../fixtures/client-sec1.key");
pub const ROGUE_CLIENT_CERT: &[u8] = include_bytes!("../fixtures/rogue-client.pem");
pub const ROGUE_CLIENT_KEY: &[u8] = include_bytes!("../fixtures/rogue-client.key");
pub const UNRELATED_KEY: &[u8] = include_bytes!("../fixtures/unrelated.key");

pub const CERT_PATH: &str = "path/to/certificate";
pub const KEY_PATH: &str = "path/to/key";
pub const CA_PATH: &str = "path/to/certificate-authority";

/// In-memory storage holding one certificate, key and CA bundle
pub fn storage_with(cert: &[u8], key: &[u8], ca: &[u8]) -> Arc<MemStorage> {
    let storage = Arc::new(MemStorage::new());
    storage.insert(CERT_PATH, cert);
    storage.insert(KEY_PATH, key);
    storage.insert(CA_PATH, ca);
    storage
}

/// Files resolved against `storage`
pub fn files_in(storage: Arc<dyn Storage>) -> X509Files {
    X509Files::new(CERT_PATH, KEY_PATH, CA_PATH).storage(storage)
}

pub fn credentials(cert: &[u8], key: &[u8], ca: &[u8], role: Role) -> TlsCredentials {
    files_in(storage_with(cert, key, ca))
        .transport_credentials(role)
        .expect("fixture credentials")
}

/// Storage that records every path it is asked to open
#[derive(Debug)]
pub struct RecordingStorage {
    inner: Arc<MemStorage>,
    opened: Mutex<Vec<PathBuf>>,
}

impl RecordingStorage {
    pub fn new(inner: Arc<MemStorage>) -> Self {
        Self {
            inner,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }
}

impl Storage for RecordingStorage {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send + '_>> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        self.inner.open(path)
    }
}

/// Storage whose reader for one path breaks off after a few bytes
#[derive(Debug)]
pub struct BrokenReadStorage {
    inner: Arc<MemStorage>,
    broken: PathBuf,
}

impl BrokenReadStorage {
    pub fn new(inner: Arc<MemStorage>, broken: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            broken: broken.into(),
        }
    }
}

impl Storage for BrokenReadStorage {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send + '_>> {
        let reader = self.inner.open(path)?;
        if path != self.broken {
            return Ok(reader);
        }
        Ok(Box::new(reader.take(16).chain(ResetReader)))
    }
}

struct ResetReader;

impl Read for ResetReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "backend went away"))
    }
}
