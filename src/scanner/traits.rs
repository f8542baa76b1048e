//! Prober trait abstraction.
//!
//! The orchestrator only talks to the network through [`Prober`], so tests
//! can substitute a scripted implementation.

use crate::types::Port;
use async_trait::async_trait;
use serde::Serialize;
use std::net::IpAddr;

/// Result of probing a single port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortProbeResult {
    /// The port that was probed.
    pub port: Port,
    /// Whether the TCP connect succeeded.
    pub open: bool,
    /// Well-known service name, empty if unknown.
    pub service: String,
    /// Captured banner, empty if none.
    pub banner: String,
}

impl PortProbeResult {
    /// A port that refused or timed out.
    pub fn closed(port: Port) -> Self {
        Self {
            port,
            open: false,
            service: String::new(),
            banner: String::new(),
        }
    }

    /// An open port with its service name.
    pub fn open(port: Port, service: impl Into<String>) -> Self {
        Self {
            port,
            open: true,
            service: service.into(),
            banner: String::new(),
        }
    }

    /// Set the banner.
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }
}

/// Network-facing probe operations.
///
/// Both methods absorb their own I/O errors: an unreachable host is `false`,
/// a refused port is a closed result.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    /// Best-effort reachability check.
    async fn is_alive(&self, host: IpAddr) -> bool;

    /// Probe one port, capturing a banner when it is open.
    async fn probe_port(&self, host: IpAddr, port: Port) -> PortProbeResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_probe_result() {
        let port = Port::new(22).unwrap();
        let result = PortProbeResult::open(port, "SSH").with_banner("SSH-2.0-OpenSSH_9.6");
        assert!(result.open);
        assert_eq!(result.service, "SSH");
        assert_eq!(result.banner, "SSH-2.0-OpenSSH_9.6");

        let closed = PortProbeResult::closed(port);
        assert!(!closed.open);
        assert!(closed.service.is_empty() && closed.banner.is_empty());
    }

    #[test]
    fn test_serializes_port_as_number() {
        let result = PortProbeResult::open(Port::new(443).unwrap(), "HTTPS");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["port"], 443);
        assert_eq!(json["open"], true);
    }
}
