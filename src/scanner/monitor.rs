//! Continuous service monitoring.
//!
//! Checks a fixed set of hosts immediately and then once per interval until
//! cancelled. Each tick is independent: nothing is carried from one tick to
//! the next.

use crate::error::ScanError;
use crate::scanner::orchestrator::Orchestrator;
use crate::scanner::results::HostResult;
use crate::scanner::traits::Prober;
use crate::types::{resolve_host, Port, TargetError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default time between checks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// A host to watch, with the name the user gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorTarget {
    pub label: String,
    pub address: IpAddr,
}

impl MonitorTarget {
    /// Resolve `host` (IP or hostname) once.
    pub async fn resolve(host: &str) -> Result<Self, TargetError> {
        Ok(Self {
            label: host.trim().to_string(),
            address: resolve_host(host).await?,
        })
    }
}

/// State of one host in one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostStatus {
    pub label: String,
    pub address: IpAddr,
    /// True when at least one watched port is open.
    pub up: bool,
    pub open_ports: Vec<u16>,
}

/// Everything observed in one check.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorTick {
    pub sequence: u64,
    pub checked_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "crate::types::millis::serialize")]
    pub duration: Duration,
    pub hosts: Vec<HostStatus>,
    /// False when the tick ran out of time before every probe finished.
    pub complete: bool,
}

impl MonitorTick {
    pub fn up_count(&self) -> usize {
        self.hosts.iter().filter(|h| h.up).count()
    }
}

/// Re-runs port checks on a fixed interval.
pub struct Monitor<P: Prober> {
    orchestrator: Orchestrator<P>,
    interval: Duration,
}

impl<P: Prober> Monitor<P> {
    pub fn new(orchestrator: Orchestrator<P>, interval: Duration) -> Result<Self, ScanError> {
        if interval.is_zero() {
            return Err(ScanError::InvalidConfig(
                "monitor interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            orchestrator,
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check every target once.
    ///
    /// Targets run under the orchestrator's host and port ceilings. Hosts
    /// whose scan had not finished when `cancel` fired are reported down.
    pub async fn check(
        &self,
        sequence: u64,
        targets: &[MonitorTarget],
        ports: &[Port],
        cancel: &CancellationToken,
    ) -> MonitorTick {
        let checked_at = Utc::now();
        let clock = Instant::now();

        let mut addresses: Vec<IpAddr> = targets.iter().map(|t| t.address).collect();
        addresses.sort_unstable();
        addresses.dedup();

        let execution = self
            .orchestrator
            .port_scan_hosts(addresses, ports, cancel)
            .await;
        let scanned: HashMap<IpAddr, HostResult> = execution
            .results
            .into_iter()
            .map(|host| (host.address, host))
            .collect();

        let hosts = targets
            .iter()
            .map(|target| {
                let found = scanned.get(&target.address);
                HostStatus {
                    label: target.label.clone(),
                    address: target.address,
                    up: found.is_some_and(|host| host.alive),
                    open_ports: found.map(HostResult::open_ports).unwrap_or_default(),
                }
            })
            .collect();

        MonitorTick {
            sequence,
            checked_at,
            duration: clock.elapsed(),
            hosts,
            complete: !(execution.cancelled || cancel.is_cancelled()),
        }
    }

    /// Check now, then every interval, until `cancel` fires.
    ///
    /// A tick that overruns the interval is cut short at the interval and
    /// the next one starts straight after it. Returns the number of ticks.
    pub async fn run<F>(
        &self,
        targets: &[MonitorTarget],
        ports: &[Port],
        cancel: &CancellationToken,
        mut on_tick: F,
    ) -> u64
    where
        F: FnMut(MonitorTick),
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sequence = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            sequence += 1;
            let scope = cancel.child_token();
            let check = self.check(sequence, targets, ports, &scope);
            let deadline = sleep(self.interval);
            tokio::pin!(check, deadline);

            let tick = tokio::select! {
                tick = &mut check => tick,
                _ = &mut deadline => {
                    warn!(sequence, "monitor check overran its interval");
                    scope.cancel();
                    check.await
                }
            };
            debug!(sequence, up = tick.up_count(), hosts = tick.hosts.len(), "monitor tick");
            on_tick(tick);
        }

        sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::mock::{ports, MockProber};
    use crate::scanner::orchestrator::ScanOptions;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn target(ip: &str) -> MonitorTarget {
        MonitorTarget {
            label: ip.to_string(),
            address: ip.parse().unwrap(),
        }
    }

    fn monitor(prober: MockProber, every: Duration) -> Monitor<MockProber> {
        Monitor::new(Orchestrator::new(prober, ScanOptions::default()), every).unwrap()
    }

    #[test]
    fn test_zero_interval_rejected() {
        let orchestrator = Orchestrator::new(MockProber::default(), ScanOptions::default());
        let err = Monitor::new(orchestrator, Duration::ZERO).err();
        assert!(matches!(err, Some(ScanError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_check_reports_up_and_down() {
        let monitor = monitor(MockProber::new(&["10.0.0.1"], &[443, 22]), DEFAULT_INTERVAL);
        let tick = monitor
            .check(
                1,
                &[target("10.0.0.1"), target("10.0.0.2")],
                &ports(&[22, 80, 443]),
                &CancellationToken::new(),
            )
            .await;

        assert!(tick.complete);
        assert_eq!(tick.up_count(), 1);
        assert_eq!(tick.hosts[0].open_ports, vec![22, 443]);
        assert!(tick.hosts[0].up);
        assert!(!tick.hosts[1].up);
        assert!(tick.hosts[1].open_ports.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_check_respects_concurrency_limits() {
        let addresses: Vec<String> = (1..=10).map(|i| format!("10.4.0.{i}")).collect();
        let alive: Vec<&str> = addresses.iter().map(String::as_str).collect();
        let mut prober = MockProber::new(&alive, &[22, 80, 443, 8080]);
        prober.port_delay = Duration::from_millis(5);
        let peak = Arc::clone(&prober.peak);

        let options = ScanOptions {
            host_concurrency: 2,
            port_concurrency: 2,
            ..ScanOptions::default()
        };
        let monitor = Monitor::new(Orchestrator::new(prober, options), DEFAULT_INTERVAL).unwrap();
        let targets: Vec<MonitorTarget> = alive.iter().map(|ip| target(ip)).collect();
        let tick = monitor
            .check(
                1,
                &targets,
                &ports(&[22, 80, 443, 8080]),
                &CancellationToken::new(),
            )
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(tick.complete);
        assert_eq!(tick.up_count(), 10);
        assert!(tick.hosts.iter().all(|h| h.open_ports == vec![22, 80, 443, 8080]));
    }

    #[tokio::test]
    async fn test_repeated_address_keeps_both_labels() {
        let monitor = monitor(MockProber::new(&["10.0.0.1"], &[22]), DEFAULT_INTERVAL);
        let targets = [
            MonitorTarget {
                label: "gateway".to_string(),
                address: "10.0.0.1".parse().unwrap(),
            },
            target("10.0.0.1"),
        ];
        let tick = monitor
            .check(1, &targets, &ports(&[22]), &CancellationToken::new())
            .await;

        assert_eq!(tick.hosts.len(), 2);
        assert_eq!(tick.hosts[0].label, "gateway");
        assert_eq!(tick.hosts[1].label, "10.0.0.1");
        assert_eq!(tick.up_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_cancelled() {
        let monitor = monitor(MockProber::new(&["10.0.0.1"], &[22]), Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let mut sequences = Vec::new();

        let ticks = monitor
            .run(&[target("10.0.0.1")], &ports(&[22]), &cancel, |tick| {
                sequences.push(tick.sequence);
                assert_eq!(tick.hosts[0].open_ports, vec![22]);
                if tick.sequence == 3 {
                    stop.cancel();
                }
            })
            .await;

        assert_eq!(ticks, 3);
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_overrunning_tick_is_cut_short() {
        let mut prober = MockProber::new(&["10.0.0.1"], &[22]);
        prober.port_delay = Duration::from_secs(5);
        let monitor = monitor(prober, Duration::from_millis(50));
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let mut seen = Vec::new();

        let start = Instant::now();
        monitor
            .run(&[target("10.0.0.1")], &ports(&[22]), &cancel, |tick| {
                seen.push(tick);
                stop.cancel();
            })
            .await;

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].complete);
        assert!(!seen[0].hosts[0].up);
    }
}
