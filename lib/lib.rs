//! Mutual TLS transport credentials built from PEM files.
//!
//! # Credential Source
//! [`X509Files`] names a leaf certificate, its private key and a certificate
//! authority bundle, and the [`Storage`] they are read from (the local
//! filesystem unless overridden).
//!
//! # Credential Builder
//! [`X509Files::transport_credentials`] reads the three files, checks that the
//! certificate and key belong together, builds a trust pool from the bundle
//! and returns [`TlsCredentials`] for either side of a connection. Servers
//! require and verify client certificates; clients present theirs and verify
//! the server against the pool.

pub mod credentials;
pub mod source;
mod utils;

pub use credentials::{ProtocolInfo, Role, TlsCredentials, TlsInfo};
pub use source::{MemStorage, OsStorage, Storage, X509Files, X509FilesOption};
pub use utils::errors::{Artifact, ErrorKind, KeyPairError, MtlsError, Result};
pub use utils::peer::PeerIdentity;
