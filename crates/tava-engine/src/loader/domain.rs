//! Protection domains and code-source certificates
//!
//! A [`ProtectionDomain`] ties a type to the origin of its code: a location
//! string and the set of certificates that signed it. Certificate identity
//! is a SHA-256 fingerprint over the encoded certificate bytes, so equality
//! is content equality, and [`CertificateSet`] is an ordered set so set
//! comparison is unordered-collection equality.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

/// A code-signing certificate, identified by content fingerprint
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Certificate {
    subject: String,
    fingerprint: String,
}

impl Certificate {
    /// Build a certificate from its subject and DER-encoded bytes
    pub fn from_der(subject: &str, der: &[u8]) -> Self {
        Self {
            subject: subject.to_string(),
            fingerprint: hex::encode(Sha256::digest(der)),
        }
    }

    /// Certificate subject
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Hex-encoded SHA-256 fingerprint of the encoded certificate
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// A set of certificates; equality ignores insertion order
pub type CertificateSet = BTreeSet<Certificate>;

/// Where code came from: a location plus the certificates that signed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSource {
    location: String,
    certificates: CertificateSet,
}

impl CodeSource {
    /// Code source at `location` signed by `certificates`
    pub fn new(location: &str, certificates: CertificateSet) -> Self {
        Self {
            location: location.to_string(),
            certificates,
        }
    }

    /// Unsigned code at `location`
    pub fn unsigned(location: &str) -> Self {
        Self::new(location, CertificateSet::new())
    }

    /// Origin location
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Signing certificates
    pub fn certificates(&self) -> &CertificateSet {
        &self.certificates
    }
}

/// The security context a type runs under. Assigned to a type exactly once,
/// at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionDomain {
    code_source: CodeSource,
}

impl ProtectionDomain {
    /// Domain for the given code source
    pub fn new(code_source: CodeSource) -> Self {
        Self { code_source }
    }

    /// Unsigned, unrestricted domain; the default when a definition
    /// supplies none
    pub fn unrestricted(location: &str) -> Self {
        Self::new(CodeSource::unsigned(location))
    }

    /// The domain's code source
    pub fn code_source(&self) -> &CodeSource {
        &self.code_source
    }

    /// Shorthand for the code-source location
    pub fn location(&self) -> &str {
        self.code_source.location()
    }

    /// Shorthand for the code-source certificates
    pub fn certificates(&self) -> &CertificateSet {
        self.code_source.certificates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_content_identity() {
        let a = Certificate::from_der("CN=vendor", b"cert-bytes");
        let b = Certificate::from_der("CN=vendor", b"cert-bytes");
        let c = Certificate::from_der("CN=vendor", b"other-bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_certificate_set_equality_ignores_order() {
        let x = Certificate::from_der("CN=x", b"x");
        let y = Certificate::from_der("CN=y", b"y");

        let mut forward = CertificateSet::new();
        forward.insert(x.clone());
        forward.insert(y.clone());

        let mut backward = CertificateSet::new();
        backward.insert(y);
        backward.insert(x);

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_unrestricted_domain_is_unsigned() {
        let domain = ProtectionDomain::unrestricted("loader:test");
        assert_eq!(domain.location(), "loader:test");
        assert!(domain.certificates().is_empty());
    }
}
