//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `netsweep ping <range>` - Find live hosts
//! - `netsweep portscan <host>` - Probe ports on one host
//! - `netsweep discover <range>` - Sweep, then port-scan every live host
//! - `netsweep monitor <host>...` - Re-check hosts on an interval
//! - `netsweep dns query|propagation|consistency|dnssec|nameservers` - Single-domain DNS checks
//! - `netsweep bulk query|propagation|consistency` - DNS checks over a domain list
//! - `netsweep ssl <host>` - Inspect the certificate of a TLS service
//! - `netsweep config path|show|init` - Inspect or create the settings file

mod bulk;
mod config;
mod dns;
mod progress;
mod scan;
mod ssl;

pub use bulk::BulkCommand;
pub use config::ConfigCommand;
pub use dns::DnsCommand;
pub use scan::{DiscoverCommand, MonitorCommand, PingCommand, PortscanCommand};
pub use ssl::SslCommand;

use crate::config::AppSettings;
use crate::error::CliResult;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// netsweep - network sweeps, port scans, monitoring and DNS checks.
///
/// Every probe runs under a bounded concurrency limit. Long commands stop on
/// Ctrl-C or when `--deadline` elapses and report what they found so far.
#[derive(Parser, Debug)]
#[command(name = "netsweep")]
#[command(author = "HueCodes <huecodes@proton.me>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Bounded-concurrency network sweeps, port scans and DNS checks",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to custom configuration file
    #[arg(long, global = true, value_name = "PATH", env = "NETSWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stop the command after this long (e.g. "30s", "5m")
    #[arg(long, global = true, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub deadline: Option<Duration>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find live hosts in a network range
    Ping(PingCommand),

    /// Scan ports on a single host
    #[command(alias = "scan")]
    Portscan(PortscanCommand),

    /// Find live hosts and scan their ports
    Discover(DiscoverCommand),

    /// Watch hosts on a fixed interval
    Monitor(MonitorCommand),

    /// DNS checks for one domain
    Dns(DnsCommand),

    /// DNS checks for every domain in a file
    Bulk(BulkCommand),

    /// Inspect a TLS certificate
    Ssl(SslCommand),

    /// Inspect or create the settings file
    Config(ConfigCommand),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping(_) => "ping",
            Self::Portscan(_) => "portscan",
            Self::Discover(_) => "discover",
            Self::Monitor(_) => "monitor",
            Self::Dns(_) => "dns",
            Self::Bulk(_) => "bulk",
            Self::Ssl(_) => "ssl",
            Self::Config(_) => "config",
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// State shared by every command handler.
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: AppSettings,
    pub format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
    /// Fires on Ctrl-C or when the deadline elapses.
    pub cancel: CancellationToken,
}

impl Context {
    /// Whether to draw progress bars and start banners.
    pub fn interactive(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Plain
    }
}

impl Cli {
    /// Load settings, install the shutdown token and run the subcommand.
    pub async fn run(self) -> CliResult<()> {
        if let Commands::Config(command) = &self.command {
            return command.execute(self.config.as_deref(), self.output);
        }

        let settings = AppSettings::load(self.config.as_deref())?;
        let format = match self.output {
            Some(format) => format,
            None => OutputFormat::from_str(&settings.output_format, true)
                .map_err(crate::error::CliError::Other)?,
        };
        let deadline = self.deadline.or(settings.deadline);

        let ctx = Context {
            settings,
            format,
            verbose: self.verbose,
            quiet: self.quiet,
            cancel: shutdown_token(deadline),
        };

        match self.command {
            Commands::Ping(command) => command.execute(&ctx).await,
            Commands::Portscan(command) => command.execute(&ctx).await,
            Commands::Discover(command) => command.execute(&ctx).await,
            Commands::Monitor(command) => command.execute(&ctx).await,
            Commands::Dns(command) => command.execute(&ctx).await,
            Commands::Bulk(command) => command.execute(&ctx).await,
            Commands::Ssl(command) => command.execute(&ctx).await,
            Commands::Config(_) => Ok(()),
        }
    }
}

/// A token cancelled on Ctrl-C or once `deadline` has passed.
pub fn shutdown_token(deadline: Option<Duration>) -> CancellationToken {
    let token = CancellationToken::new();
    let watcher = token.clone();

    tokio::spawn(async move {
        let expiry = async move {
            match deadline {
                Some(limit) => sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expiry);

        tokio::select! {
            _ = watcher.cancelled() => return,
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => warn!("interrupted, finishing with partial results"),
                Err(e) => {
                    warn!(error = %e, "cannot listen for Ctrl-C");
                    tokio::select! {
                        _ = watcher.cancelled() => return,
                        _ = &mut expiry => {
                            warn!("deadline reached, finishing with partial results")
                        }
                    }
                }
            },
            _ = &mut expiry => warn!("deadline reached, finishing with partial results"),
        }
        watcher.cancel();
    });

    token
}
