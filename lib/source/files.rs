//! Locations of the certificate, key and certificate authority PEM files.

use crate::source::storage::{self, OsStorage, Storage};
use crate::utils::errors::{Artifact, MtlsError, Result};

use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Options accepted by [`X509Files::with_options`]. Later options win.
#[derive(Debug, Clone)]
pub enum X509FilesOption {
    /// Read the files through a different storage backend
    Storage(Arc<dyn Storage>),
}

/// Paths to the PEM material of one mTLS endpoint, plus the storage they are
/// read from.
///
/// Constructing one performs no I/O. The files are read afresh every time
/// credentials are built, so rotating the files on disk and building again
/// picks up the new material.
///
/// # Example Usage
///
/// ```rust, ignore
/// let files = X509Files::new("tls/server.pem", "tls/server.key", "tls/ca.pem");
/// let credentials = files.transport_credentials(Role::Server)?;
/// ```
#[derive(Debug, Clone)]
pub struct X509Files {
    certificate_file: PathBuf,
    key_file: PathBuf,
    certificate_authority_file: PathBuf,
    storage: Arc<dyn Storage>,
}

/// Raw bytes of the three artifacts, read in order.
pub(crate) struct Material {
    pub certificate: Vec<u8>,
    pub key: Vec<u8>,
    pub certificate_authority: Vec<u8>,
}

impl X509Files {
    /// Files read from the local filesystem
    pub fn new(
        certificate_file: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
        certificate_authority_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            certificate_file: certificate_file.into(),
            key_file: key_file.into(),
            certificate_authority_file: certificate_authority_file.into(),
            storage: Arc::new(OsStorage),
        }
    }

    /// Files read according to `options`, applied in the order given
    pub fn with_options(
        certificate_file: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
        certificate_authority_file: impl Into<PathBuf>,
        options: impl IntoIterator<Item = X509FilesOption>,
    ) -> Self {
        let mut files = Self::new(certificate_file, key_file, certificate_authority_file);
        for option in options {
            match option {
                X509FilesOption::Storage(storage) => files.storage = storage,
            }
        }
        files
    }

    /// Replace the storage backend
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Read the three paths from `{prefix}_CERT_FILE`, `{prefix}_KEY_FILE`
    /// and `{prefix}_CA_FILE`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let var = |suffix: &str| -> Result<PathBuf> {
            let name = format!("{}_{}", prefix, suffix);
            env::var_os(&name)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .ok_or(MtlsError::MissingSetting(name))
        };
        Ok(Self::new(var("CERT_FILE")?, var("KEY_FILE")?, var("CA_FILE")?))
    }

    pub fn certificate_file(&self) -> &Path {
        &self.certificate_file
    }

    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    pub fn certificate_authority_file(&self) -> &Path {
        &self.certificate_authority_file
    }

    /// Read the full content of `path` through the configured storage.
    ///
    /// Failures are tagged with the artifact being read.
    pub fn load_bytes(&self, artifact: Artifact, path: &Path) -> Result<Vec<u8>> {
        let data = storage::read_all(self.storage.as_ref(), path).map_err(|source| {
            MtlsError::Io {
                artifact,
                path: path.to_path_buf(),
                source,
            }
        })?;
        log::debug!("Loaded {} from {} ({} bytes)", artifact, path.display(), data.len());
        Ok(data)
    }

    /// Load the certificate, key and certificate authority, in that order,
    /// stopping at the first one that cannot be read.
    pub(crate) fn load(&self) -> Result<Material> {
        let certificate = self.load_bytes(Artifact::Certificate, &self.certificate_file)?;
        let key = self.load_bytes(Artifact::Key, &self.key_file)?;
        let certificate_authority = self.load_bytes(
            Artifact::CertificateAuthority,
            &self.certificate_authority_file,
        )?;
        Ok(Material {
            certificate,
            key,
            certificate_authority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemStorage;
    use crate::utils::errors::ErrorKind;

    #[test]
    fn test_new_x509_files() {
        let files = X509Files::new(
            "/path/to/certificate",
            "/path/to/key",
            "/path/to/certificate-authority",
        );
        assert_eq!(files.certificate_file(), Path::new("/path/to/certificate"));
        assert_eq!(files.key_file(), Path::new("/path/to/key"));
        assert_eq!(
            files.certificate_authority_file(),
            Path::new("/path/to/certificate-authority")
        );
        assert!(format!("{:?}", files).contains("OsStorage"));
    }

    #[test]
    fn test_options_apply_in_order() -> Result<()> {
        let first = Arc::new(MemStorage::new());
        first.insert("cert", "from first");
        let second = Arc::new(MemStorage::new());
        second.insert("cert", "from second");

        let files = X509Files::with_options(
            "cert",
            "key",
            "ca",
            vec![
                X509FilesOption::Storage(first),
                X509FilesOption::Storage(second),
            ],
        );
        let data = files.load_bytes(Artifact::Certificate, files.certificate_file())?;
        assert_eq!(data, b"from second");
        Ok(())
    }

    #[test]
    fn test_load_reports_failing_artifact() {
        let storage = Arc::new(MemStorage::new());
        storage.insert("cert", "c");
        storage.insert("key", "k");
        let files = X509Files::new("cert", "key", "ca").storage(storage);

        let err = files.load().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.artifact(), Some(Artifact::CertificateAuthority));
        assert!(err.to_string().contains("certificate authority file ca"));
    }

    #[test]
    fn test_from_env() -> Result<()> {
        env::set_var("MTLS_FILES_TEST_CERT_FILE", "/etc/tls/cert.pem");
        env::set_var("MTLS_FILES_TEST_KEY_FILE", "/etc/tls/key.pem");
        env::set_var("MTLS_FILES_TEST_CA_FILE", "/etc/tls/ca.pem");
        let files = X509Files::from_env("MTLS_FILES_TEST")?;
        assert_eq!(files.key_file(), Path::new("/etc/tls/key.pem"));

        let err = X509Files::from_env("MTLS_FILES_UNSET").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.to_string(), "missing setting: MTLS_FILES_UNSET_CERT_FILE");
        Ok(())
    }
}
