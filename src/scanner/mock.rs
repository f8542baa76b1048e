//! Scripted prober for engine tests.

use crate::scanner::traits::{PortProbeResult, Prober};
use crate::types::Port;
use async_trait::async_trait;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Answers from fixed sets instead of the network.
#[derive(Debug, Default)]
pub struct MockProber {
    pub alive: HashSet<IpAddr>,
    pub open: HashSet<u16>,
    pub liveness_delay: Duration,
    pub port_delay: Duration,
    /// Highest number of port probes seen running at once.
    pub peak: Arc<AtomicUsize>,
    active: AtomicUsize,
}

impl MockProber {
    pub fn new(alive: &[&str], open: &[u16]) -> Self {
        Self {
            alive: alive.iter().map(|ip| ip.parse().unwrap()).collect(),
            open: open.iter().copied().collect(),
            ..Self::default()
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Prober for MockProber {
    async fn is_alive(&self, host: IpAddr) -> bool {
        if !self.liveness_delay.is_zero() {
            sleep(self.liveness_delay).await;
        }
        self.alive.contains(&host)
    }

    async fn probe_port(&self, host: IpAddr, port: Port) -> PortProbeResult {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.active);
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.port_delay.is_zero() {
            sleep(self.port_delay).await;
        }
        if self.alive.contains(&host) && self.open.contains(&port.as_u16()) {
            PortProbeResult::open(port, "mock")
        } else {
            PortProbeResult::closed(port)
        }
    }
}

pub fn ports(list: &[u16]) -> Vec<Port> {
    list.iter().map(|&p| Port::new(p).unwrap()).collect()
}
