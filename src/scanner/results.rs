//! Scan result types and their assembly.
//!
//! A [`ScanResult`] is only built through [`ScanResult::assemble`], which
//! imposes the final ordering and computes the summary once all concurrent
//! work has finished. Completion order never leaks into the output.

use crate::scanner::traits::PortProbeResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

/// Outcome for one scanned host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostResult {
    pub address: IpAddr,
    pub alive: bool,
    /// Open ports, ascending.
    pub ports: Vec<PortProbeResult>,
    #[serde(rename = "latency_ms", serialize_with = "crate::types::millis::serialize")]
    pub latency: Duration,
}

impl HostResult {
    /// A host that answered a liveness probe.
    pub fn alive(address: IpAddr, latency: Duration) -> Self {
        Self {
            address,
            alive: true,
            ports: Vec::new(),
            latency,
        }
    }

    /// Attach probe results, keeping only open ports, sorted by port.
    pub fn with_ports(mut self, ports: Vec<PortProbeResult>) -> Self {
        self.ports = ports.into_iter().filter(|p| p.open).collect();
        self.ports.sort_by_key(|p| p.port);
        self
    }

    /// Port numbers of the open ports.
    pub fn open_ports(&self) -> Vec<u16> {
        self.ports.iter().map(|p| p.port.as_u16()).collect()
    }
}

/// Aggregate counters for a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Addresses in the target range.
    pub total_hosts: usize,
    /// Hosts reported alive.
    pub live_hosts: usize,
    /// Ports requested per host.
    pub total_ports: usize,
    /// Open ports found across all hosts.
    pub open_ports: usize,
    /// Hosts actually probed (less than `total_hosts` after cancellation).
    pub hosts_scanned: usize,
    /// Port probes attempted across all live hosts.
    pub ports_scanned: usize,
}

/// The terminal artifact of a sweep or discovery run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// The target range as given.
    pub network: String,
    /// Hosts in ascending numeric address order.
    pub hosts: Vec<HostResult>,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "crate::types::millis::serialize")]
    pub duration: Duration,
    pub summary: ScanSummary,
    /// False when the scan was cancelled before every host was probed.
    pub complete: bool,
}

/// Inputs to [`ScanResult::assemble`].
#[derive(Debug)]
pub struct ScanTally {
    pub network: String,
    pub total_hosts: usize,
    pub hosts_scanned: usize,
    pub ports_requested: usize,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub complete: bool,
}

impl ScanResult {
    /// Sort, deduplicate and summarise the aggregated hosts.
    pub fn assemble(mut hosts: Vec<HostResult>, tally: ScanTally) -> Self {
        let mut seen = HashSet::new();
        hosts.retain(|h| seen.insert(h.address));
        hosts.sort_by_key(|h| h.address);
        for host in &mut hosts {
            host.ports.sort_by_key(|p| p.port);
        }

        let live_hosts = hosts.iter().filter(|h| h.alive).count();
        let summary = ScanSummary {
            total_hosts: tally.total_hosts,
            live_hosts,
            total_ports: tally.ports_requested,
            open_ports: hosts.iter().map(|h| h.ports.len()).sum(),
            hosts_scanned: tally.hosts_scanned,
            ports_scanned: live_hosts * tally.ports_requested,
        };

        Self {
            network: tally.network,
            hosts,
            started_at: tally.started_at,
            duration: tally.duration,
            summary,
            complete: tally.complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;

    fn host(ip: &str) -> HostResult {
        HostResult::alive(ip.parse().unwrap(), Duration::from_millis(3))
    }

    fn tally(total_hosts: usize, ports_requested: usize) -> ScanTally {
        ScanTally {
            network: "10.0.0.0/24".to_string(),
            total_hosts,
            hosts_scanned: total_hosts,
            ports_requested,
            started_at: Utc::now(),
            duration: Duration::from_millis(10),
            complete: true,
        }
    }

    #[test]
    fn test_hosts_sorted_numerically() {
        let hosts = vec![host("10.0.0.10"), host("10.0.0.2"), host("10.0.0.1")];
        let result = ScanResult::assemble(hosts, tally(254, 0));
        let order: Vec<String> = result.hosts.iter().map(|h| h.address.to_string()).collect();
        assert_eq!(order, vec!["10.0.0.1", "10.0.0.2", "10.0.0.10"]);
    }

    #[test]
    fn test_duplicate_hosts_collapsed() {
        let hosts = vec![host("10.0.0.5"), host("10.0.0.5")];
        let result = ScanResult::assemble(hosts, tally(254, 0));
        assert_eq!(result.hosts.len(), 1);
        assert_eq!(result.summary.live_hosts, 1);
    }

    #[test]
    fn test_with_ports_drops_closed_and_sorts() {
        let p = |n| Port::new(n).unwrap();
        let probes = vec![
            PortProbeResult::open(p(443), "HTTPS"),
            PortProbeResult::closed(p(80)),
            PortProbeResult::open(p(22), "SSH"),
        ];
        let h = host("10.0.0.1").with_ports(probes);
        assert_eq!(h.open_ports(), vec![22, 443]);
    }

    #[test]
    fn test_summary_consistent() {
        let p = |n| Port::new(n).unwrap();
        let hosts = vec![
            host("10.0.0.1").with_ports(vec![PortProbeResult::open(p(22), "SSH")]),
            host("10.0.0.2"),
        ];
        let result = ScanResult::assemble(hosts, tally(254, 3));
        let s = result.summary;
        assert_eq!(s.live_hosts, 2);
        assert_eq!(s.open_ports, 1);
        assert_eq!(s.ports_scanned, 6);
        assert_eq!(s.total_ports, 3);
        assert!(s.live_hosts <= s.total_hosts);
        assert!(s.open_ports <= s.ports_scanned);
    }
}
