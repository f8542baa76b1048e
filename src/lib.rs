//! # netsweep - Bounded-Concurrency Network Diagnostics
//!
//! netsweep finds live hosts, scans their ports, watches services over time
//! and checks DNS records across many nameservers and domains. Every probe
//! runs under an explicit concurrency ceiling, and every long operation can
//! be cut short and still report what it found.
//!
//! ## Features
//!
//! - **Ping sweeps and discovery**: CIDR ranges, `/24` shorthand or single IPs
//! - **Two execution strategies**: fixed-size batches or a worker pool
//! - **Port scanning**: TCP connect probes with service names and banners
//! - **Monitoring**: periodic checks with per-tick time limits
//! - **DNS**: queries, propagation, consistency and DNSSEC checks, singly or in bulk
//! - **TLS**: certificate identity, expiry and trust for any TLS service
//! - **Multiple Output Formats**: Plain text, JSON, and CSV
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use netsweep::scanner::{Orchestrator, ScanOptions, TcpProber};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = Orchestrator::new(TcpProber::default(), ScanOptions::default());
//!     let ports = netsweep::types::parse_ports("22,80,443").unwrap();
//!     let cancel = CancellationToken::new();
//!
//!     let result = orchestrator.discover("192.168.1.0/24", &ports, &cancel).await.unwrap();
//!     for host in &result.hosts {
//!         println!("{} {:?}", host.address, host.open_ports());
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Address ranges and port specifications
//! - [`scanner`] - Probers, the bounded executor, orchestration and monitoring
//! - [`dns`] - DNS queries, checks and bulk processing
//! - [`ssl`] - TLS certificate checks
//! - [`config`] - Settings file handling
//! - [`error`] - Error types
//! - [`output`] - Output formatting utilities
//! - [`cli`] - Command-line front end

pub mod banner;
pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod services;
pub mod ssl;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, DnsError, ScanError, SslError};
pub use scanner::{
    BoundedExecutor, ExecutionStrategy, HostResult, Orchestrator, Prober, ScanOptions,
    ScanResult, TcpProber,
};
pub use types::{AddressRange, Port, PortSpec};
