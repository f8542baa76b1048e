//! Scanning engine.
//!
//! Everything that touches the network for sweeps, port scans, discovery and
//! monitoring lives here. The pieces stack up from [`traits::Prober`] (one
//! probe) through [`executor::BoundedExecutor`] (many probes, bounded) to
//! [`orchestrator::Orchestrator`] (a whole scan) and [`monitor::Monitor`]
//! (a scan on repeat).

pub mod executor;
pub mod monitor;
pub mod orchestrator;
pub mod rate_limiter;
pub mod results;
pub mod tcp;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

pub use executor::{
    BoundedExecutor, Execution, ExecutionStrategy, ProgressCallback, ProgressEvent,
};
pub use monitor::{HostStatus, Monitor, MonitorTarget, MonitorTick};
pub use orchestrator::{Orchestrator, ScanOptions, Strategy};
pub use rate_limiter::RateLimiter;
pub use results::{HostResult, ScanResult, ScanSummary};
pub use tcp::{ProbeConfig, TcpProber, LIVENESS_PORTS};
pub use traits::{PortProbeResult, Prober};
