//! TLS handshake and certificate capture.

use super::{CertificateDetails, CertificateInfo};
use crate::error::SslError;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::client::{ServerCertVerified, ServerCertVerifier, WebPkiVerifier};
use tokio_rustls::rustls::{
    Certificate, ClientConfig, Error as TlsError, OwnedTrustAnchor, RootCertStore, ServerName,
};
use tokio_rustls::TlsConnector;
use tracing::debug;

pub const DEFAULT_TLS_PORT: u16 = 443;

type Verdict = Arc<Mutex<Option<Result<(), String>>>>;

/// Runs the normal WebPKI verification, records its outcome and lets the
/// handshake continue either way.
struct RecordingVerifier {
    inner: WebPkiVerifier,
    verdict: Verdict,
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &Certificate,
        intermediates: &[Certificate],
        server_name: &ServerName,
        scts: &mut dyn Iterator<Item = &[u8]>,
        ocsp_response: &[u8],
        now: SystemTime,
    ) -> Result<ServerCertVerified, TlsError> {
        let outcome = self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, scts, ocsp_response, now)
            .map(|_| ())
            .map_err(|e| e.to_string());
        let mut verdict = match self.verdict.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *verdict = Some(outcome);
        Ok(ServerCertVerified::assertion())
    }
}

fn public_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));
    roots
}

fn client_config(verdict: Verdict) -> ClientConfig {
    let verifier = RecordingVerifier {
        inner: WebPkiVerifier::new(public_roots(), None),
        verdict,
    };
    ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth()
}

/// Fetches and inspects the certificate a TLS service presents.
#[derive(Debug, Clone)]
pub struct CertificateChecker {
    timeout: Duration,
}

impl Default for CertificateChecker {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl CertificateChecker {
    /// `timeout` bounds the connect and the handshake together.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn check(&self, host: &str, port: u16) -> Result<CertificateInfo, SslError> {
        let host = host.trim();
        let target = if host.contains(':') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };
        let server_name =
            ServerName::try_from(host).map_err(|_| SslError::InvalidHost(host.to_string()))?;

        let verdict = Verdict::default();
        let connector = TlsConnector::from(Arc::new(client_config(Arc::clone(&verdict))));
        let handshake = async {
            let tcp = TcpStream::connect((host, port))
                .await
                .map_err(|source| SslError::Connect {
                    target: target.clone(),
                    source,
                })?;
            connector
                .connect(server_name, tcp)
                .await
                .map_err(|source| SslError::Handshake {
                    target: target.clone(),
                    source,
                })
        };
        let stream = timeout(self.timeout, handshake)
            .await
            .map_err(|_| SslError::Timeout(target.clone()))??;

        let (_, session) = stream.get_ref();
        let chain = session
            .peer_certificates()
            .filter(|chain| !chain.is_empty())
            .ok_or_else(|| SslError::NoCertificate(target.clone()))?;

        let checked_at = Utc::now();
        let certificate = CertificateDetails::from_der(&chain[0].0, checked_at)?;
        let trust = match verdict.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let trust_error = match trust {
            Some(Ok(())) => None,
            Some(Err(reason)) => Some(reason),
            None => Some("certificate was not verified".to_string()),
        };
        debug!(
            %target,
            chain = chain.len(),
            trusted = trust_error.is_none(),
            days = certificate.days_remaining,
            "certificate fetched"
        );

        Ok(CertificateInfo {
            host: host.to_string(),
            port,
            host_matches: certificate.matches_host(host),
            certificate,
            trusted: trust_error.is_none(),
            trust_error,
            chain_length: chain.len(),
            checked_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{LOCALHOST_CERT, LOCALHOST_KEY};
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio_rustls::rustls::{PrivateKey, ServerConfig};
    use tokio_rustls::TlsAcceptor;

    async fn tls_server() -> u16 {
        let config = ServerConfig::builder()
            .with_safe_defaults()
            .with_no_client_auth()
            .with_single_cert(
                vec![Certificate(LOCALHOST_CERT.to_vec())],
                PrivateKey(LOCALHOST_KEY.to_vec()),
            )
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                if let Ok(mut tls) = acceptor.accept(tcp).await {
                    let _ = tls.shutdown().await;
                }
            }
        });
        port
    }

    #[tokio::test]
    async fn test_self_signed_certificate_is_untrusted_but_read() {
        let port = tls_server().await;
        let info = CertificateChecker::default()
            .check("127.0.0.1", port)
            .await
            .unwrap();

        assert_eq!(info.port, port);
        assert_eq!(info.certificate.common_name.as_deref(), Some("netsweep.test"));
        assert!(info.certificate.valid_now);
        assert!(info.host_matches);
        assert_eq!(info.chain_length, 1);
        assert!(!info.trusted);
        assert!(info.trust_error.is_some());
    }

    #[tokio::test]
    async fn test_closed_port_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = CertificateChecker::default()
            .check("127.0.0.1", port)
            .await
            .unwrap_err();
        assert!(matches!(err, SslError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_plain_tcp_service_fails_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut tcp, _)) = listener.accept().await {
                let _ = tcp.write_all(b"SSH-2.0-OpenSSH_9.6\r\n").await;
            }
        });

        let err = CertificateChecker::default()
            .check("127.0.0.1", port)
            .await
            .unwrap_err();
        assert!(matches!(err, SslError::Handshake { .. }));
    }

    #[tokio::test]
    async fn test_silent_service_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let held = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(held);
        });

        let err = CertificateChecker::new(Duration::from_millis(200))
            .check("127.0.0.1", port)
            .await
            .unwrap_err();
        assert!(matches!(err, SslError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_invalid_host_name() {
        let err = CertificateChecker::default()
            .check("not a host", 443)
            .await
            .unwrap_err();
        assert!(matches!(err, SslError::InvalidHost(_)));
    }
}
