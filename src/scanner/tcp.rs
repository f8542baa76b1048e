//! TCP connect prober.
//!
//! Liveness and port state are both decided with plain `connect()` calls, so
//! no elevated privileges are needed. ICMP is never used.

use crate::banner::{grab_banner, BANNER_TIMEOUT};
use crate::scanner::traits::{PortProbeResult, Prober};
use crate::services::service_name;
use crate::types::Port;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Ports raced by the liveness check. Ordered by how often they answer.
pub const LIVENESS_PORTS: [u16; 10] = [80, 443, 22, 21, 23, 25, 53, 135, 139, 445];

/// Timeouts and switches for [`TcpProber`].
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Port probe connect timeout.
    pub connect_timeout: Duration,
    /// Overall budget for one liveness check.
    pub liveness_deadline: Duration,
    /// Timeout for each liveness connect attempt.
    pub attempt_timeout: Duration,
    /// Read deadline for banner capture.
    pub banner_timeout: Duration,
    pub grab_banners: bool,
    pub liveness_ports: Vec<u16>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            liveness_deadline: Duration::from_millis(200),
            attempt_timeout: Duration::from_millis(100),
            banner_timeout: BANNER_TIMEOUT,
            grab_banners: true,
            liveness_ports: LIVENESS_PORTS.to_vec(),
        }
    }
}

/// The production [`Prober`].
#[derive(Debug, Clone, Default)]
pub struct TcpProber {
    config: ProbeConfig,
}

impl TcpProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn is_alive(&self, host: IpAddr) -> bool {
        let scope = CancellationToken::new();
        let mut attempts = JoinSet::new();

        for &port in &self.config.liveness_ports {
            let scope = scope.clone();
            let attempt_timeout = self.config.attempt_timeout;
            attempts.spawn(async move {
                let addr = SocketAddr::new(host, port);
                tokio::select! {
                    _ = scope.cancelled() => false,
                    // The stream is dropped as soon as the match is made.
                    connect = timeout(attempt_timeout, TcpStream::connect(addr)) => {
                        matches!(connect, Ok(Ok(_)))
                    }
                }
            });
        }

        let first_success = async {
            while let Some(joined) = attempts.join_next().await {
                if let Ok(true) = joined {
                    return true;
                }
            }
            false
        };
        let alive = timeout(self.config.liveness_deadline, first_success)
            .await
            .unwrap_or(false);

        scope.cancel();
        attempts.abort_all();
        trace!(%host, alive, "liveness check");
        alive
    }

    async fn probe_port(&self, host: IpAddr, port: Port) -> PortProbeResult {
        let addr = SocketAddr::new(host, port.as_u16());
        let connect = TcpStream::connect(addr);
        let mut stream = match timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                trace!(%addr, error = %e, "connect failed");
                return PortProbeResult::closed(port);
            }
            Err(_) => return PortProbeResult::closed(port),
        };

        let service = service_name(port.as_u16()).unwrap_or_default();
        let result = PortProbeResult::open(port, service);
        if !self.config.grab_banners {
            return result;
        }

        let banner = grab_banner(&mut stream, port.as_u16(), self.config.banner_timeout).await;
        result.with_banner(banner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Instant;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    async fn listener() -> (TcpListener, Port) {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port()).unwrap();
        (listener, port)
    }

    #[test]
    fn test_default_config() {
        let config = ProbeConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.liveness_deadline, Duration::from_millis(200));
        assert_eq!(config.attempt_timeout, Duration::from_millis(100));
        assert_eq!(config.liveness_ports, LIVENESS_PORTS.to_vec());
    }

    #[tokio::test]
    async fn test_open_port_with_banner() {
        let (listener, port) = listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"SSH-2.0-Test\r\n").await.unwrap();
        });

        let prober = TcpProber::default();
        let result = prober.probe_port(LOCALHOST, port).await;
        assert!(result.open);
        assert_eq!(result.banner, "SSH-2.0-Test");
    }

    #[tokio::test]
    async fn test_banner_disabled() {
        let (listener, port) = listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let _ = socket.write_all(b"hello\r\n").await;
        });

        let prober = TcpProber::new(ProbeConfig {
            grab_banners: false,
            ..ProbeConfig::default()
        });
        let result = prober.probe_port(LOCALHOST, port).await;
        assert!(result.open);
        assert!(result.banner.is_empty());
    }

    #[tokio::test]
    async fn test_closed_port() {
        let (listener, port) = listener().await;
        drop(listener);

        let prober = TcpProber::new(ProbeConfig {
            connect_timeout: Duration::from_millis(200),
            ..ProbeConfig::default()
        });
        let result = prober.probe_port(LOCALHOST, port).await;
        assert_eq!(result, PortProbeResult::closed(port));
    }

    #[tokio::test]
    async fn test_liveness_first_success_wins() {
        let (open_listener, port) = listener().await;
        let (closed, closed_port) = listener().await;
        drop(closed);
        tokio::spawn(async move {
            loop {
                let _ = open_listener.accept().await;
            }
        });

        let prober = TcpProber::new(ProbeConfig {
            liveness_ports: vec![closed_port.as_u16(), port.as_u16()],
            ..ProbeConfig::default()
        });
        assert!(prober.is_alive(LOCALHOST).await);
    }

    #[tokio::test]
    async fn test_liveness_gives_up_at_deadline() {
        let (closed, closed_port) = listener().await;
        drop(closed);

        let prober = TcpProber::new(ProbeConfig {
            liveness_ports: vec![closed_port.as_u16()],
            ..ProbeConfig::default()
        });
        let start = Instant::now();
        assert!(!prober.is_alive(LOCALHOST).await);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
