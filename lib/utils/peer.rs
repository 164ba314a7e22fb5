//! Identity of an authenticated peer, read from its certificate

use x509_parser::{
    extensions::{GeneralName, ParsedExtension},
    prelude::{FromDer, X509Certificate},
};

/// Names carried by a peer's leaf certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerIdentity {
    /// First subject common name
    pub common_name: Option<String>,
    /// DNS names from the SAN extension
    pub dns_names: Vec<String>,
    /// RFC822 (email) names from the SAN extension
    pub emails: Vec<String>,
}

impl PeerIdentity {
    /// Parse a DER certificate. Returns `None` if it is not valid X.509.
    pub fn from_der(der: &[u8]) -> Option<Self> {
        let (_, cert) = X509Certificate::from_der(der).ok()?;

        let mut identity = PeerIdentity {
            common_name: cert
                .subject()
                .iter_common_name()
                .next()
                .and_then(|cn| cn.as_str().ok())
                .map(str::to_string),
            ..Default::default()
        };

        for ext in cert.extensions() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => identity.dns_names.push(dns.to_string()),
                        GeneralName::RFC822Name(email) => identity.emails.push(email.to_string()),
                        _ => {}
                    }
                }
            }
        }
        Some(identity)
    }

    /// The most specific user id: the first email, else the common name
    pub fn user_id(&self) -> Option<&str> {
        self.emails
            .first()
            .map(String::as_str)
            .or(self.common_name.as_deref())
    }
}
