//! Scan orchestration.
//!
//! Composes address enumeration, the bounded executor and a [`Prober`] into
//! the three scan shapes: ping sweep, single-host port scan and network
//! discovery. Discovery runs the same algorithm under either executor
//! strategy; only the host-level dispatch differs.

use crate::error::ScanError;
use crate::scanner::executor::{BoundedExecutor, Execution, ExecutionStrategy, ProgressCallback};
use crate::scanner::rate_limiter::RateLimiter;
use crate::scanner::results::{HostResult, ScanResult, ScanTally};
use crate::scanner::traits::{PortProbeResult, Prober};
use crate::types::{AddressRange, Port};
use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Host-level dispatch for discovery and sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    #[default]
    Batched,
    Pool,
}

/// Concurrency knobs for an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Simultaneous host probes.
    pub host_concurrency: usize,
    /// Simultaneous port probes, shared by every host of a discovery run.
    pub port_concurrency: usize,
    pub host_batch: usize,
    pub port_batch: usize,
    pub strategy: Strategy,
    pub pool_workers: usize,
    pub pool_queue: usize,
    /// Probes per second, 0 for unlimited.
    pub rate_limit: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            host_concurrency: 500,
            port_concurrency: 5000,
            host_batch: 254,
            port_batch: 1000,
            strategy: Strategy::Batched,
            pool_workers: 50,
            pool_queue: 100,
            rate_limit: 0,
        }
    }
}

impl ScanOptions {
    fn host_strategy(&self) -> ExecutionStrategy {
        match self.strategy {
            Strategy::Batched => ExecutionStrategy::Batched {
                batch_size: self.host_batch,
            },
            Strategy::Pool => ExecutionStrategy::WorkerPool {
                workers: self.pool_workers,
                queue_depth: self.pool_queue,
            },
        }
    }
}

/// Drives scans through a [`Prober`].
pub struct Orchestrator<P: Prober> {
    prober: Arc<P>,
    options: ScanOptions,
    rate_limiter: Option<RateLimiter>,
    progress: Option<ProgressCallback>,
}

impl<P: Prober> Orchestrator<P> {
    pub fn new(prober: P, options: ScanOptions) -> Self {
        let rate_limiter = RateLimiter::new(options.rate_limit);
        Self {
            prober: Arc::new(prober),
            options,
            rate_limiter,
            progress: None,
        }
    }

    /// Report progress of the outermost executor of each scan.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    fn host_executor(&self) -> BoundedExecutor {
        let executor =
            BoundedExecutor::new(self.options.host_concurrency, self.options.host_strategy())
                .with_rate_limit(self.rate_limiter.clone());
        self.attach_progress(executor)
    }

    fn port_executor(&self) -> BoundedExecutor {
        BoundedExecutor::new(
            self.options.port_concurrency,
            ExecutionStrategy::Batched {
                batch_size: self.options.port_batch,
            },
        )
        .with_rate_limit(self.rate_limiter.clone())
    }

    fn attach_progress(&self, executor: BoundedExecutor) -> BoundedExecutor {
        match &self.progress {
            Some(callback) => executor.with_progress(Arc::clone(callback)),
            None => executor,
        }
    }

    /// Find live hosts in `target` (CIDR, `/24` shorthand or bare IP).
    pub async fn ping_sweep(
        &self,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        let range: AddressRange = target.parse()?;
        let addresses = range.addresses();
        let total_hosts = addresses.len();
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(
            %range,
            hosts = total_hosts,
            strategy = ?self.options.strategy,
            "starting ping sweep"
        );

        let prober = Arc::clone(&self.prober);
        let execution = self
            .host_executor()
            .run(addresses, cancel, move |host| {
                let prober = Arc::clone(&prober);
                async move {
                    let start = Instant::now();
                    let alive = prober.is_alive(host).await;
                    alive.then(|| HostResult::alive(host, start.elapsed()))
                }
            })
            .await;

        Ok(ScanResult::assemble(
            execution.results,
            ScanTally {
                network: target.to_string(),
                total_hosts,
                hosts_scanned: execution.processed,
                ports_requested: 0,
                started_at,
                duration: clock.elapsed(),
                complete: !execution.cancelled,
            },
        ))
    }

    /// Probe `ports` on one host. The host counts as alive when any port is open.
    pub async fn port_scan(
        &self,
        host: IpAddr,
        ports: &[Port],
        cancel: &CancellationToken,
    ) -> HostResult {
        debug!(%host, ports = ports.len(), "starting port scan");
        let executor = self.attach_progress(self.port_executor());
        scan_ports(Arc::clone(&self.prober), &executor, host, ports.to_vec(), cancel).await
    }

    /// Port-scan several hosts at once.
    ///
    /// Hosts run under the host ceiling and share one port-level semaphore.
    /// Hosts still in flight when `cancel` fires are left out of the results.
    pub async fn port_scan_hosts(
        &self,
        hosts: Vec<IpAddr>,
        ports: &[Port],
        cancel: &CancellationToken,
    ) -> Execution<HostResult> {
        let port_executor = self.port_executor();
        let ports: Arc<[Port]> = ports.into();
        let prober = Arc::clone(&self.prober);
        let scope = cancel.clone();

        self.host_executor()
            .run(hosts, cancel, move |host| {
                let prober = Arc::clone(&prober);
                let port_executor = port_executor.clone();
                let ports = Arc::clone(&ports);
                let scope = scope.clone();
                async move {
                    let result =
                        scan_ports(prober, &port_executor, host, ports.to_vec(), &scope).await;
                    Some(result)
                }
            })
            .await
    }

    /// Sweep `target` and port-scan every live host.
    ///
    /// Live hosts are reported even when none of `ports` is open. All hosts
    /// share one port-level semaphore.
    pub async fn discover(
        &self,
        target: &str,
        ports: &[Port],
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        let range: AddressRange = target.parse()?;
        let addresses = range.addresses();
        let total_hosts = addresses.len();
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(
            %range,
            hosts = total_hosts,
            ports = ports.len(),
            strategy = ?self.options.strategy,
            "starting discovery"
        );

        let port_executor = self.port_executor();
        let ports: Arc<[Port]> = ports.into();
        let ports_requested = ports.len();
        let prober = Arc::clone(&self.prober);
        let scope = cancel.clone();

        let execution = self
            .host_executor()
            .run(addresses, cancel, move |host| {
                let prober = Arc::clone(&prober);
                let port_executor = port_executor.clone();
                let ports = Arc::clone(&ports);
                let scope = scope.clone();
                async move {
                    let start = Instant::now();
                    if !prober.is_alive(host).await {
                        return None;
                    }
                    let latency = start.elapsed();
                    let found = port_executor
                        .run(ports.to_vec(), &scope, move |port| {
                            probe_open(Arc::clone(&prober), host, port)
                        })
                        .await;
                    Some(HostResult::alive(host, latency).with_ports(found.results))
                }
            })
            .await;

        let result = ScanResult::assemble(
            execution.results,
            ScanTally {
                network: target.to_string(),
                total_hosts,
                hosts_scanned: execution.processed,
                ports_requested,
                started_at,
                duration: clock.elapsed(),
                complete: !execution.cancelled,
            },
        );
        info!(
            live = result.summary.live_hosts,
            open = result.summary.open_ports,
            complete = result.complete,
            "discovery finished"
        );
        Ok(result)
    }
}

async fn probe_open<P: Prober>(
    prober: Arc<P>,
    host: IpAddr,
    port: Port,
) -> Option<PortProbeResult> {
    let result = prober.probe_port(host, port).await;
    result.open.then_some(result)
}

async fn scan_ports<P: Prober>(
    prober: Arc<P>,
    executor: &BoundedExecutor,
    host: IpAddr,
    ports: Vec<Port>,
    cancel: &CancellationToken,
) -> HostResult {
    let clock = Instant::now();
    let execution = executor
        .run(ports, cancel, move |port| {
            probe_open(Arc::clone(&prober), host, port)
        })
        .await;

    HostResult {
        address: host,
        alive: !execution.results.is_empty(),
        ports: Vec::new(),
        latency: clock.elapsed(),
    }
    .with_ports(execution.results)
}
