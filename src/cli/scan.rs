//! Scan subcommand implementations.
//!
//! Handles `ping`, `portscan`, `discover` and `monitor`. Flags override the
//! loaded settings field by field.

use super::progress::scan_bar;
use super::Context;
use crate::config::AppSettings;
use crate::error::CliResult;
use crate::output;
use crate::scanner::{
    Monitor, MonitorTarget, Orchestrator, ProbeConfig, ScanOptions, ScanResult, Strategy,
    TcpProber, LIVENESS_PORTS,
};
use crate::types::{parse_ports, resolve_host, AddressRange, Port};
use clap::{Args, Parser, ValueEnum};
use std::time::Duration;
use tracing::info;

const DEFAULT_PORTS: &str = "1-1024";

/// Host-level dispatch strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StrategyArg {
    /// Fixed-size batches, each fully drained before the next
    #[default]
    Batched,
    /// Long-lived workers fed from a bounded queue
    Pool,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Batched => Strategy::Batched,
            StrategyArg::Pool => Strategy::Pool,
        }
    }
}

/// Tuning flags shared by every scan command.
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Maximum simultaneous host probes
    #[arg(long, value_name = "N")]
    pub host_concurrency: Option<usize>,

    /// Maximum simultaneous port probes
    #[arg(long, value_name = "N")]
    pub port_concurrency: Option<usize>,

    /// Connect timeout for port probes (e.g. "800ms")
    #[arg(short, long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Probes per second, 0 for unlimited
    #[arg(short, long, value_name = "PPS")]
    pub rate: Option<u32>,

    /// Do not read service banners from open ports
    #[arg(long)]
    pub no_banner: bool,

    /// Host-level dispatch strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,
}

impl ScanArgs {
    pub fn options(&self, settings: &AppSettings) -> ScanOptions {
        ScanOptions {
            host_concurrency: self.host_concurrency.unwrap_or(settings.host_concurrency),
            port_concurrency: self.port_concurrency.unwrap_or(settings.port_concurrency),
            host_batch: settings.host_batch_size,
            port_batch: settings.port_batch_size,
            strategy: self.strategy.unwrap_or_default().into(),
            pool_workers: settings.pool_workers,
            pool_queue: settings.pool_queue_depth,
            rate_limit: self.rate.unwrap_or(settings.rate_limit),
        }
    }

    pub fn probe_config(&self, settings: &AppSettings) -> ProbeConfig {
        ProbeConfig {
            connect_timeout: self.timeout.unwrap_or(settings.connect_timeout),
            liveness_deadline: settings.liveness_deadline,
            attempt_timeout: settings.attempt_timeout,
            banner_timeout: settings.banner_timeout,
            grab_banners: settings.grab_banners && !self.no_banner,
            liveness_ports: LIVENESS_PORTS.to_vec(),
        }
    }

    fn orchestrator(&self, settings: &AppSettings) -> Orchestrator<TcpProber> {
        Orchestrator::new(
            TcpProber::new(self.probe_config(settings)),
            self.options(settings),
        )
    }
}

fn ports_arg(spec: &str) -> CliResult<Vec<Port>> {
    Ok(parse_ports(spec)?)
}

fn finish_scan(ctx: &Context, result: &ScanResult) -> CliResult<()> {
    output::format_results(result, ctx.format)?;
    if !result.complete && !ctx.quiet {
        output::print_warning(&format!(
            "stopped early: {} of {} hosts probed",
            result.summary.hosts_scanned, result.summary.total_hosts
        ));
    }
    Ok(())
}

/// Find live hosts in a network range.
#[derive(Parser, Debug)]
pub struct PingCommand {
    /// CIDR range, "a.b.c.0/24" shorthand, or a single IP
    #[arg(value_name = "RANGE")]
    pub range: String,

    #[command(flatten)]
    pub scan: ScanArgs,
}

impl PingCommand {
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let range: AddressRange = self.range.parse()?;
        if ctx.interactive() {
            output::print_start_header(
                "Ping sweep",
                &self.range,
                &format!("{} addresses", range.len()),
            );
        }

        let (bar, progress) = scan_bar(range.len(), ctx.interactive());
        let orchestrator = self.scan.orchestrator(&ctx.settings).with_progress(progress);
        let result = orchestrator.ping_sweep(&self.range, &ctx.cancel).await;
        bar.finish_and_clear();

        finish_scan(ctx, &result?)
    }
}

/// Scan ports on a single host.
#[derive(Parser, Debug)]
pub struct PortscanCommand {
    /// Hostname or IP address
    #[arg(value_name = "HOST")]
    pub host: String,

    /// Ports to scan (e.g. "22", "22,80,443", "1-1024,8000-8100")
    #[arg(short, long, default_value = DEFAULT_PORTS)]
    pub ports: String,

    #[command(flatten)]
    pub scan: ScanArgs,
}

impl PortscanCommand {
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let ports = ports_arg(&self.ports)?;
        let address = resolve_host(&self.host).await?;
        if ctx.interactive() {
            output::print_start_header(
                "Port scan",
                &format!("{} ({})", self.host, address),
                &format!("{} ports", ports.len()),
            );
        }

        let (bar, progress) = scan_bar(ports.len(), ctx.interactive());
        let orchestrator = self.scan.orchestrator(&ctx.settings).with_progress(progress);
        let host = orchestrator.port_scan(address, &ports, &ctx.cancel).await;
        bar.finish_and_clear();

        output::format_results(&host, ctx.format)?;
        if ctx.cancel.is_cancelled() && !ctx.quiet {
            output::print_warning("stopped early: some ports were not probed");
        }
        Ok(())
    }
}

/// Find live hosts and scan their ports.
#[derive(Parser, Debug)]
pub struct DiscoverCommand {
    /// CIDR range, "a.b.c.0/24" shorthand, or a single IP
    #[arg(value_name = "RANGE")]
    pub range: String,

    /// Ports to scan on each live host
    #[arg(short, long, default_value = DEFAULT_PORTS)]
    pub ports: String,

    #[command(flatten)]
    pub scan: ScanArgs,
}

impl DiscoverCommand {
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let ports = ports_arg(&self.ports)?;
        let range: AddressRange = self.range.parse()?;
        let options = self.scan.options(&ctx.settings);
        if ctx.interactive() {
            output::print_start_header(
                "Discovery",
                &self.range,
                &format!(
                    "{} addresses, {} ports, {:?} strategy",
                    range.len(),
                    ports.len(),
                    options.strategy
                ),
            );
        }

        let (bar, progress) = scan_bar(range.len(), ctx.interactive());
        let orchestrator = self.scan.orchestrator(&ctx.settings).with_progress(progress);
        let result = orchestrator.discover(&self.range, &ports, &ctx.cancel).await;
        bar.finish_and_clear();

        finish_scan(ctx, &result?)
    }
}

/// Watch hosts on a fixed interval.
#[derive(Parser, Debug)]
pub struct MonitorCommand {
    /// Hostnames or IP addresses to watch
    #[arg(value_name = "HOST", required = true)]
    pub hosts: Vec<String>,

    /// Ports that make a host count as up
    #[arg(short, long, default_value = "22,80,443")]
    pub ports: String,

    /// Time between checks (e.g. "10s", "1m")
    #[arg(short, long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Stop after this many checks
    #[arg(short = 'n', long, value_name = "N")]
    pub count: Option<u64>,

    #[command(flatten)]
    pub scan: ScanArgs,
}

impl MonitorCommand {
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let ports = ports_arg(&self.ports)?;
        let mut targets = Vec::with_capacity(self.hosts.len());
        for host in &self.hosts {
            targets.push(MonitorTarget::resolve(host).await?);
        }

        let interval = self.interval.unwrap_or(ctx.settings.monitor_interval);
        let monitor = Monitor::new(self.scan.orchestrator(&ctx.settings), interval)?;
        if ctx.interactive() {
            output::print_start_header(
                "Monitor",
                &self.hosts.join(", "),
                &format!(
                    "{} ports every {}",
                    ports.len(),
                    humantime::format_duration(interval)
                ),
            );
        }

        let format = ctx.format;
        let limit = self.count;
        let stop = ctx.cancel.clone();
        let mut write_error = None;
        let ticks = monitor
            .run(&targets, &ports, &ctx.cancel, |tick| {
                let first = tick.sequence == 1;
                let reached = limit.is_some_and(|n| tick.sequence >= n);
                if let Err(e) = output::format_stream_item(&tick, format, first) {
                    write_error = Some(e);
                    stop.cancel();
                }
                if reached {
                    stop.cancel();
                }
            })
            .await;
        info!(ticks, "monitor stopped");

        match write_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let settings = AppSettings {
            host_concurrency: 64,
            rate_limit: 100,
            ..AppSettings::default()
        };
        let args = ScanArgs {
            port_concurrency: Some(10),
            timeout: Some(Duration::from_millis(250)),
            no_banner: true,
            strategy: Some(StrategyArg::Pool),
            ..ScanArgs::default()
        };

        let options = args.options(&settings);
        assert_eq!(options.host_concurrency, 64);
        assert_eq!(options.port_concurrency, 10);
        assert_eq!(options.rate_limit, 100);
        assert_eq!(options.strategy, Strategy::Pool);

        let probe = args.probe_config(&settings);
        assert_eq!(probe.connect_timeout, Duration::from_millis(250));
        assert!(!probe.grab_banners);
        assert_eq!(probe.liveness_deadline, settings.liveness_deadline);
    }

    #[test]
    fn test_settings_used_without_flags() {
        let settings = AppSettings::default();
        let options = ScanArgs::default().options(&settings);
        assert_eq!(options.port_concurrency, settings.port_concurrency);
        assert_eq!(options.strategy, Strategy::Batched);
        assert!(ScanArgs::default().probe_config(&settings).grab_banners);
    }

    #[test]
    fn test_bad_port_spec_is_rejected() {
        assert!(ports_arg("80,abc").is_err());
        assert_eq!(ports_arg("22,80").unwrap().len(), 2);
    }
}
