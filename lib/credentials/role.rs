//! Which end of the connection a credential is built for

use crate::utils::errors::MtlsError;
use std::{fmt, str::FromStr};

/// The side of a mutually authenticated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Dials out, presents its certificate and verifies the server against
    /// the certificate authority pool
    Client,
    /// Accepts connections and rejects any peer that does not present a
    /// certificate issued by the pool
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::Client => f.write_str("client"),
            Role::Server => f.write_str("server"),
        }
    }
}

impl FromStr for Role {
    type Err = MtlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "server" => Ok(Role::Server),
            _ => Err(MtlsError::InvalidRole(s.to_string())),
        }
    }
}

// Ordinal encoding used by configuration formats that store roles as numbers
impl TryFrom<u8> for Role {
    type Error = MtlsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::Client),
            1 => Ok(Role::Server),
            other => Err(MtlsError::InvalidRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::ErrorKind;

    #[test]
    fn test_parse_role() {
        assert_eq!("client".parse::<Role>().ok(), Some(Role::Client));
        assert_eq!(" Server ".parse::<Role>().ok(), Some(Role::Server));
        assert_eq!(Role::try_from(0).ok(), Some(Role::Client));
        assert_eq!(Role::try_from(1).ok(), Some(Role::Server));
    }

    #[test]
    fn test_reject_unknown_role() {
        for err in [
            "peer".parse::<Role>().unwrap_err(),
            "".parse::<Role>().unwrap_err(),
            Role::try_from(2).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::Config);
            assert!(err.to_string().starts_with("invalid role"));
        }
    }

    #[test]
    fn test_display_roundtrip() {
        for role in [Role::Client, Role::Server] {
            assert_eq!(role.to_string().parse::<Role>().ok(), Some(role));
        }
    }
}
