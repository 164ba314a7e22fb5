//! # Credential Builder
//! Parses the loaded PEM material and assembles the TLS policy for a role.

mod builder;
mod role;
mod transport;

pub use self::role::Role;
pub use self::transport::{
    ProtocolInfo, TlsCredentials, TlsInfo, ALPN_H2, SECURITY_PROTOCOL, SECURITY_VERSION,
};
