//! TLS certificate checks.
//!
//! Connects to a TLS service, takes the certificate it presents and reports
//! its identity, validity window and whether it chains to a public root.
//! The handshake accepts any certificate so that expired or self-signed
//! ones can still be inspected; trust is reported, not enforced.

mod checker;

pub use checker::{CertificateChecker, DEFAULT_TLS_PORT};

use crate::error::SslError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use x509_parser::prelude::*;

/// Certificates expiring within this many days are flagged.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// Fields read from one X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateDetails {
    pub subject: String,
    pub common_name: Option<String>,
    pub issuer: String,
    /// DNS names and IP addresses from the subject alternative names.
    pub alt_names: Vec<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Whole days until expiry, negative once expired.
    pub days_remaining: i64,
    /// `now` falls inside the validity window.
    pub valid_now: bool,
    pub serial_number: String,
    pub signature_algorithm: String,
}

impl CertificateDetails {
    /// Parse a DER certificate and evaluate it at `now`.
    pub fn from_der(der: &[u8], now: DateTime<Utc>) -> Result<Self, SslError> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|e| SslError::Parse(e.to_string()))?;

        let validity = cert.validity();
        let not_before = timestamp(validity.not_before.timestamp())?;
        let not_after = timestamp(validity.not_after.timestamp())?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string);

        let mut alt_names = Vec::new();
        for ext in cert.extensions() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => alt_names.push(dns.to_string()),
                        GeneralName::IPAddress(ip) => {
                            if let Some(ip) = ip_from_bytes(ip) {
                                alt_names.push(ip.to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(Self {
            subject: cert.subject().to_string(),
            common_name,
            issuer: cert.issuer().to_string(),
            alt_names,
            not_before,
            not_after,
            days_remaining: (not_after - now).num_days(),
            valid_now: not_before <= now && now <= not_after,
            serial_number: cert.raw_serial_as_string(),
            signature_algorithm: signature_name(&cert.signature_algorithm.algorithm.to_id_string()),
        })
    }

    pub fn expires_soon(&self) -> bool {
        self.valid_now && self.days_remaining < EXPIRY_WARNING_DAYS
    }

    /// Whether `host` is covered by the common name or an alternative name.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.alt_names
            .iter()
            .chain(self.common_name.iter())
            .any(|pattern| name_matches(&pattern.to_ascii_lowercase(), &host))
    }
}

/// Result of checking the certificate served at `host:port`.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateInfo {
    pub host: String,
    pub port: u16,
    #[serde(flatten)]
    pub certificate: CertificateDetails,
    /// The host name is covered by the certificate.
    pub host_matches: bool,
    /// The presented chain verifies against the bundled public roots.
    pub trusted: bool,
    pub trust_error: Option<String>,
    /// Certificates presented, leaf included.
    pub chain_length: usize,
    pub checked_at: DateTime<Utc>,
}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>, SslError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| SslError::Parse(format!("validity time out of range: {}", seconds)))
}

fn ip_from_bytes(bytes: &[u8]) -> Option<std::net::IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(Into::into),
        16 => <[u8; 16]>::try_from(bytes).ok().map(Into::into),
        _ => None,
    }
}

/// Exact match, or a single leading wildcard label covering one label.
fn name_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(suffix) => host
            .split_once('.')
            .is_some_and(|(label, rest)| !label.is_empty() && rest == suffix),
        None => pattern == host,
    }
}

fn signature_name(oid: &str) -> String {
    let name = match oid {
        "1.2.840.113549.1.1.5" => "sha1WithRSAEncryption",
        "1.2.840.113549.1.1.11" => "sha256WithRSAEncryption",
        "1.2.840.113549.1.1.12" => "sha384WithRSAEncryption",
        "1.2.840.113549.1.1.13" => "sha512WithRSAEncryption",
        "1.2.840.113549.1.1.10" => "rsassa-pss",
        "1.2.840.10045.4.3.2" => "ecdsa-with-SHA256",
        "1.2.840.10045.4.3.3" => "ecdsa-with-SHA384",
        "1.2.840.10045.4.3.4" => "ecdsa-with-SHA512",
        "1.3.101.112" => "ED25519",
        _ => return oid.to_string(),
    };
    name.to_string()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    fn localhost_at(rfc3339: &str) -> CertificateDetails {
        CertificateDetails::from_der(LOCALHOST_CERT, at(rfc3339)).unwrap()
    }

    #[test]
    fn test_reads_identity_and_alt_names() {
        let cert = localhost_at("2030-06-01T00:00:00Z");
        assert_eq!(cert.common_name.as_deref(), Some("netsweep.test"));
        assert!(cert.subject.contains("CN=netsweep.test"));
        assert!(cert.issuer.contains("O=netsweep"));
        assert_eq!(
            cert.alt_names,
            vec!["netsweep.test", "www.netsweep.test", "127.0.0.1"]
        );
        assert_eq!(cert.signature_algorithm, "ecdsa-with-SHA256");
        assert_eq!(
            cert.serial_number.to_ascii_uppercase(),
            "57:A7:0B:77:75:10:A1:4D:B5:EC:F2:7E:0C:E0:DF:E2:B2:20:41:28"
        );
    }

    #[test]
    fn test_validity_window() {
        let cert = localhost_at("2030-06-01T00:00:00Z");
        assert_eq!(cert.not_before, at("2025-01-01T00:00:00Z"));
        assert_eq!(cert.not_after, at("2045-01-01T00:00:00Z"));
        assert!(cert.valid_now);
        assert!(!cert.expires_soon());

        let late = localhost_at("2044-12-12T00:00:00Z");
        assert_eq!(late.days_remaining, 20);
        assert!(late.expires_soon());

        let early = localhost_at("2024-12-31T00:00:00Z");
        assert!(!early.valid_now);
    }

    #[test]
    fn test_expired_certificate() {
        let cert = CertificateDetails::from_der(EXPIRED_CERT, at("2021-01-11T00:00:00Z")).unwrap();
        assert_eq!(cert.common_name.as_deref(), Some("expired.netsweep.test"));
        assert!(!cert.valid_now);
        assert_eq!(cert.days_remaining, -10);
        assert!(!cert.expires_soon());
        assert!(cert.alt_names.is_empty());
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = CertificateDetails::from_der(b"not a certificate", Utc::now()).unwrap_err();
        assert!(matches!(err, SslError::Parse(_)));
    }

    #[test]
    fn test_host_matching() {
        let cert = CertificateDetails::from_der(LOCALHOST_CERT, Utc::now()).unwrap();
        assert!(cert.matches_host("www.netsweep.test"));
        assert!(cert.matches_host("NETSWEEP.test."));
        assert!(cert.matches_host("127.0.0.1"));
        assert!(!cert.matches_host("mail.netsweep.test"));

        assert!(name_matches("*.example.com", "www.example.com"));
        assert!(!name_matches("*.example.com", "example.com"));
        assert!(!name_matches("*.example.com", "a.b.example.com"));
    }
}
