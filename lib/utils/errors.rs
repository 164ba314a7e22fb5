//! Error handling for credential loading, assembly and handshakes

use crate::credentials::Role;
use std::{fmt, io, path::PathBuf};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = MtlsError> = std::result::Result<T, E>;

/// The three pieces of PEM material a credential is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Certificate,
    Key,
    CertificateAuthority,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Artifact::Certificate => f.write_str("certificate"),
            Artifact::Key => f.write_str("key"),
            Artifact::CertificateAuthority => f.write_str("certificate authority"),
        }
    }
}

/// Coarse classification of an [`MtlsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An artifact could not be opened or fully read
    Io,
    /// Bytes were read but did not form usable PEM material
    Parse,
    /// The caller asked for something that can never work
    Config,
    /// A handshake driven through the credential failed
    Handshake,
}

/// Reasons the leaf certificate and private key were rejected as a pair.
#[derive(Debug, Error)]
pub enum KeyPairError {
    #[error("no certificate found in certificate PEM")]
    MissingCertificate,

    #[error("no private key found in key PEM")]
    MissingPrivateKey,

    #[error("malformed PEM: {0}")]
    Malformed(#[source] io::Error),

    #[error("certificate is not valid X.509: {0}")]
    InvalidCertificate(#[source] rustls::Error),

    #[error("unsupported private key: {0}")]
    Unsupported(#[source] rustls::Error),

    #[error("private key does not match certificate: {0}")]
    Mismatch(#[source] rustls::Error),
}

/// Errors returned while building or using mTLS transport credentials.
#[derive(Debug, Error)]
pub enum MtlsError {
    #[error("failed to read {artifact} file {}: {source}", .path.display())]
    Io {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to load key pair: {0}")]
    KeyPair(#[from] KeyPairError),

    #[error("failed to append certificate authority to pool: no usable certificates ({rejected} rejected)")]
    EmptyTrustPool { rejected: usize },

    #[error("failed to assemble TLS policy: {0}")]
    Policy(#[from] rustls::Error),

    #[error("failed to build client certificate verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("credentials were built for the {actual} role, not {expected}")]
    RoleMismatch { expected: Role, actual: Role },

    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    #[error("missing setting: {0}")]
    MissingSetting(String),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),
}

impl MtlsError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MtlsError::Io { .. } => ErrorKind::Io,
            MtlsError::KeyPair(_)
            | MtlsError::EmptyTrustPool { .. }
            | MtlsError::Policy(_)
            | MtlsError::Verifier(_) => ErrorKind::Parse,
            MtlsError::InvalidRole(_)
            | MtlsError::RoleMismatch { .. }
            | MtlsError::InvalidServerName(_)
            | MtlsError::MissingSetting(_) => ErrorKind::Config,
            MtlsError::Handshake(_) => ErrorKind::Handshake,
        }
    }

    /// Whether retrying the same call can succeed without new input.
    ///
    /// Parse and configuration errors need different material or a code fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io | ErrorKind::Handshake)
    }

    /// The artifact an I/O failure refers to
    pub fn artifact(&self) -> Option<Artifact> {
        match self {
            MtlsError::Io { artifact, .. } => Some(*artifact),
            _ => None,
        }
    }
}
