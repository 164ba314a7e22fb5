//! The transport credential handed to the RPC layer.
//!
//! A [`TlsCredentials`] wraps the rustls policy assembled for one role. It can
//! drive a handshake directly over any tokio stream, or be converted into the
//! TLS configuration types tonic expects for `Channel` and `Server`.

use crate::credentials::Role;
use crate::utils::errors::{MtlsError, Result};
use crate::utils::peer::PeerIdentity;

use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConfig, CommonState, ProtocolVersion, ServerConfig};
use std::{fmt, sync::Arc};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::{client, server, TlsAcceptor, TlsConnector};
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};

/// Security protocol reported by every credential
pub const SECURITY_PROTOCOL: &str = "tls";

/// Version reported before any handshake has negotiated one
pub const SECURITY_VERSION: &str = "1.2";

/// ALPN protocol advertised by both roles
pub const ALPN_H2: &[u8] = b"h2";

/// Static description of the security a credential provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub security_protocol: &'static str,
    pub security_version: &'static str,
    /// Name the client verifies the server against, empty unless overridden
    pub server_name: String,
}

#[derive(Clone)]
pub(crate) enum Policy {
    Client(Arc<ClientConfig>),
    Server(Arc<ServerConfig>),
}

/// Mutual TLS credentials for one side of a connection.
///
/// Cloning is cheap; the rustls configs are shared.
#[derive(Clone)]
pub struct TlsCredentials {
    policy: Policy,
    server_name: Option<String>,

    // PEM forms for tonic, which builds its own rustls configs
    identity: Identity,
    ca: Certificate,
}

impl fmt::Debug for TlsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TlsCredentials")
            .field("role", &self.role())
            .field("server_name", &self.server_name)
            .finish()
    }
}

impl TlsCredentials {
    pub(crate) fn new(policy: Policy, identity: Identity, ca: Certificate) -> Self {
        Self {
            policy,
            server_name: None,
            identity,
            ca,
        }
    }

    /// The role these credentials were built for
    pub fn role(&self) -> Role {
        match self.policy {
            Policy::Client(_) => Role::Client,
            Policy::Server(_) => Role::Server,
        }
    }

    /// Protocol information, available before any handshake
    pub fn info(&self) -> ProtocolInfo {
        ProtocolInfo {
            security_protocol: SECURITY_PROTOCOL,
            security_version: SECURITY_VERSION,
            server_name: self.server_name.clone().unwrap_or_default(),
        }
    }

    /// Verify the server against `name` instead of the host dialed.
    pub fn override_server_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        ServerName::try_from(name.as_str())
            .map_err(|e| MtlsError::InvalidServerName(format!("{}: {}", name, e)))?;
        self.server_name = Some(name);
        Ok(())
    }

    /// The rustls policy of a client credential
    pub fn client_config(&self) -> Result<Arc<ClientConfig>> {
        match &self.policy {
            Policy::Client(config) => Ok(Arc::clone(config)),
            Policy::Server(_) => Err(self.mismatch(Role::Client)),
        }
    }

    /// The rustls policy of a server credential
    pub fn server_config(&self) -> Result<Arc<ServerConfig>> {
        match &self.policy {
            Policy::Server(config) => Ok(Arc::clone(config)),
            Policy::Client(_) => Err(self.mismatch(Role::Server)),
        }
    }

    /// Run the client side of the handshake over `io`.
    ///
    /// `authority` is the `host[:port]` being dialed; its host is the name
    /// the server certificate must carry unless one was set with
    /// [`TlsCredentials::override_server_name`].
    pub async fn client_handshake<IO>(
        &self,
        authority: &str,
        io: IO,
    ) -> Result<(client::TlsStream<IO>, TlsInfo)>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        let config = self.client_config()?;
        let name = match &self.server_name {
            Some(name) => name.clone(),
            None => authority_host(authority).to_string(),
        };
        let server_name = ServerName::try_from(name.clone())
            .map_err(|e| MtlsError::InvalidServerName(format!("{}: {}", name, e)))?;

        let stream = TlsConnector::from(config)
            .connect(server_name, io)
            .await
            .map_err(MtlsError::Handshake)?;
        let info = TlsInfo::new(stream.get_ref().1);
        Ok((stream, info))
    }

    /// Run the server side of the handshake over `io`.
    ///
    /// Peers without a certificate chaining to the pool are rejected here.
    pub async fn server_handshake<IO>(&self, io: IO) -> Result<(server::TlsStream<IO>, TlsInfo)>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        let config = self.server_config()?;
        let stream = TlsAcceptor::from(config)
            .accept(io)
            .await
            .map_err(MtlsError::Handshake)?;
        let info = TlsInfo::new(stream.get_ref().1);
        Ok((stream, info))
    }

    /// Configuration for a tonic `Endpoint::tls_config`
    pub fn tonic_client_config(&self) -> Result<ClientTlsConfig> {
        if self.role() != Role::Client {
            return Err(self.mismatch(Role::Client));
        }
        let config = ClientTlsConfig::new()
            .ca_certificate(self.ca.clone())
            .identity(self.identity.clone());
        Ok(match &self.server_name {
            Some(name) => config.domain_name(name.clone()),
            None => config,
        })
    }

    /// Configuration for a tonic `Server::tls_config`. Client certificates
    /// are mandatory.
    pub fn tonic_server_config(&self) -> Result<ServerTlsConfig> {
        if self.role() != Role::Server {
            return Err(self.mismatch(Role::Server));
        }
        Ok(ServerTlsConfig::new()
            .identity(self.identity.clone())
            .client_ca_root(self.ca.clone())
            .client_auth_optional(false))
    }

    fn mismatch(&self, expected: Role) -> MtlsError {
        MtlsError::RoleMismatch {
            expected,
            actual: self.role(),
        }
    }
}

/// What a completed handshake negotiated.
#[derive(Debug, Clone)]
pub struct TlsInfo {
    protocol_version: Option<ProtocolVersion>,
    alpn_protocol: Option<Vec<u8>>,
    peer_certificates: Vec<CertificateDer<'static>>,
}

impl TlsInfo {
    fn new(connection: &CommonState) -> Self {
        Self {
            protocol_version: connection.protocol_version(),
            alpn_protocol: connection.alpn_protocol().map(<[u8]>::to_vec),
            peer_certificates: connection
                .peer_certificates()
                .map(<[CertificateDer<'static>]>::to_vec)
                .unwrap_or_default(),
        }
    }

    pub fn auth_type(&self) -> &'static str {
        SECURITY_PROTOCOL
    }

    /// Negotiated TLS version, e.g. "1.3"
    pub fn security_version(&self) -> Option<&'static str> {
        match self.protocol_version.as_ref()? {
            ProtocolVersion::TLSv1_2 => Some("1.2"),
            ProtocolVersion::TLSv1_3 => Some("1.3"),
            _ => None,
        }
    }

    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.alpn_protocol.as_deref()
    }

    /// Certificates the peer presented, leaf first
    pub fn peer_certificates(&self) -> &[CertificateDer<'static>] {
        &self.peer_certificates
    }

    /// Identity read from the peer's leaf certificate
    pub fn peer_identity(&self) -> Option<PeerIdentity> {
        self.peer_certificates
            .first()
            .and_then(|leaf| PeerIdentity::from_der(leaf))
    }
}

/// Host part of a `host[:port]` or `[v6]:port` authority
fn authority_host(authority: &str) -> &str {
    if let Some(rest) = authority.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            host
        }
        _ => authority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_host() {
        assert_eq!(authority_host("localhost:50051"), "localhost");
        assert_eq!(authority_host("localhost"), "localhost");
        assert_eq!(authority_host("127.0.0.1:443"), "127.0.0.1");
        assert_eq!(authority_host("[::1]:50051"), "::1");
        assert_eq!(authority_host("::1"), "::1");
    }

    #[test]
    fn test_security_version() {
        let mut info = TlsInfo {
            protocol_version: Some(ProtocolVersion::TLSv1_3),
            alpn_protocol: None,
            peer_certificates: Vec::new(),
        };
        assert_eq!(info.security_version(), Some("1.3"));
        assert_eq!(info.auth_type(), "tls");
        assert!(info.peer_identity().is_none());

        info.protocol_version = None;
        assert_eq!(info.security_version(), None);
    }
}
