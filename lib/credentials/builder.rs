//! Turns the three PEM artifacts into role specific mTLS credentials.

use crate::credentials::transport::{Policy, TlsCredentials, ALPN_H2};
use crate::credentials::Role;
use crate::source::{Material, X509Files};
use crate::utils::errors::{KeyPairError, MtlsError, Result};

use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::sign::CertifiedKey;
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use std::sync::Arc;

/// Leaf certificate chain with the private key it was checked against
struct KeyPair {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

/// Certificate authorities that made it into the pool
struct TrustPool {
    roots: RootCertStore,
    accepted: Vec<CertificateDer<'static>>,
}

impl X509Files {
    /// Build mutual TLS credentials for `role`.
    ///
    /// The certificate, key and certificate authority files are read in that
    /// order on every call; the first unreadable one aborts the build before
    /// anything after it is read.
    pub fn transport_credentials(&self, role: Role) -> Result<TlsCredentials> {
        let material = self.load()?;
        build(&material, role)
    }

    /// Like [`X509Files::transport_credentials`] for a role given as text.
    ///
    /// An unknown role fails before any file is read.
    pub fn transport_credentials_for(&self, role: &str) -> Result<TlsCredentials> {
        let role: Role = role.parse()?;
        self.transport_credentials(role)
    }
}

fn build(material: &Material, role: Role) -> Result<TlsCredentials> {
    let provider = Arc::new(ring::default_provider());

    let pair = parse_key_pair(&provider, &material.certificate, &material.key)?;
    let pool = parse_trust_pool(&material.certificate_authority)?;

    let identity = tonic::transport::Identity::from_pem(&material.certificate, &material.key);
    let ca = tonic::transport::Certificate::from_pem(encode_pem(&pool.accepted));

    let policy = match role {
        Role::Client => {
            let mut config = ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()?
                .with_root_certificates(pool.roots)
                .with_client_auth_cert(pair.chain, pair.key)?;
            config.alpn_protocols = vec![ALPN_H2.to_vec()];
            Policy::Client(Arc::new(config))
        }
        Role::Server => {
            let verifier =
                WebPkiClientVerifier::builder_with_provider(Arc::new(pool.roots), provider.clone())
                    .build()?;
            let mut config = ServerConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()?
                .with_client_cert_verifier(verifier)
                .with_single_cert(pair.chain, pair.key)?;
            config.alpn_protocols = vec![ALPN_H2.to_vec()];
            Policy::Server(Arc::new(config))
        }
    };

    log::debug!("Built {} mTLS credentials", role);
    Ok(TlsCredentials::new(policy, identity, ca))
}

/// Parse the leaf chain and private key and check that they belong together
fn parse_key_pair(
    provider: &CryptoProvider,
    certificate_pem: &[u8],
    key_pem: &[u8],
) -> Result<KeyPair, KeyPairError> {
    let mut reader = certificate_pem;
    let chain = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(KeyPairError::Malformed)?;
    if chain.is_empty() {
        return Err(KeyPairError::MissingCertificate);
    }

    let mut reader = key_pem;
    let key = rustls_pemfile::private_key(&mut reader)
        .map_err(KeyPairError::Malformed)?
        .ok_or(KeyPairError::MissingPrivateKey)?;

    let signing_key = provider
        .key_provider
        .load_private_key(key.clone_key())
        .map_err(KeyPairError::Unsupported)?;
    CertifiedKey::new(chain.clone(), signing_key)
        .keys_match()
        .map_err(|e| match e {
            rustls::Error::InconsistentKeys(_) => KeyPairError::Mismatch(e),
            // The leaf has to be parsed before its public key can be compared.
            _ => KeyPairError::InvalidCertificate(e),
        })?;

    Ok(KeyPair { chain, key })
}

/// Add every certificate of the bundle that parses to a fresh pool.
///
/// Entries that are not valid certificates are skipped. The bundle only
/// fails as a whole when nothing usable is left.
fn parse_trust_pool(certificate_authority_pem: &[u8]) -> Result<TrustPool> {
    let mut rejected = 0;
    let mut roots = RootCertStore::empty();
    let mut accepted = Vec::new();

    for section in certificate_sections(certificate_authority_pem) {
        let mut reader = section;
        for item in rustls_pemfile::certs(&mut reader) {
            let cert = match item {
                Ok(cert) => cert,
                Err(e) => {
                    log::debug!("Skipping malformed PEM block in CA bundle: {}", e);
                    rejected += 1;
                    continue;
                }
            };
            match roots.add(cert.clone()) {
                Ok(()) => accepted.push(cert),
                Err(e) => {
                    log::debug!("Skipping unusable CA certificate: {}", e);
                    rejected += 1;
                }
            }
        }
    }

    if accepted.is_empty() {
        return Err(MtlsError::EmptyTrustPool { rejected });
    }
    if rejected > 0 {
        // Mixed bundles are accepted; surface them so they get cleaned up.
        log::warn!(
            "CA bundle has {} unusable entries; using the {} valid certificates",
            rejected,
            accepted.len()
        );
    }
    log::debug!("Trust pool holds {} certificate authorities", accepted.len());
    Ok(TrustPool { roots, accepted })
}

const CERTIFICATE_BEGIN: &[u8] = b"-----BEGIN CERTIFICATE-----";

/// Split a bundle in front of every certificate BEGIN line.
///
/// Each section is scanned on its own, so a block that is never terminated
/// only loses itself and not the certificates that follow it. Text before
/// the first BEGIN line cannot hold a certificate and is dropped.
fn certificate_sections(bundle: &[u8]) -> Vec<&[u8]> {
    let starts: Vec<usize> = bundle
        .windows(CERTIFICATE_BEGIN.len())
        .enumerate()
        .filter_map(|(i, window)| (window == CERTIFICATE_BEGIN).then_some(i))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(bundle.len());
            &bundle[start..end]
        })
        .collect()
}

fn encode_pem(certs: &[CertificateDer<'_>]) -> String {
    let blocks: Vec<pem::Pem> = certs
        .iter()
        .map(|cert| pem::Pem::new("CERTIFICATE", cert.to_vec()))
        .collect();
    pem::encode_many(&blocks)
}
