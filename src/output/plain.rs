//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::dns::dnssec::algorithm_name;
use crate::dns::{
    BulkPayload, BulkSummary, ConsistencyReport, DnssecReport, Nameserver, PropagationResult,
    QueryResult, Severity,
};
use crate::scanner::{HostResult, MonitorTick, ScanResult};
use crate::ssl::CertificateInfo;
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

/// Human-readable rendering of a result.
pub trait Plain {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Print a value in plain text to stdout.
pub fn print_plain<T: Plain + ?Sized>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    value.write_plain(&mut out)?;
    out.flush()
}

fn write_header(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out, "                    {} {}", style("netsweep").cyan().bold(), title)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)
}

fn write_footer(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)
}

fn write_field(out: &mut dyn Write, label: &str, value: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "  {} {}", style(label).bold(), value)
}

fn write_partial_notice(out: &mut dyn Write, complete: bool) -> io::Result<()> {
    if !complete {
        writeln!(
            out,
            "  {}",
            style("Interrupted: results below are partial.").yellow().bold()
        )?;
    }
    Ok(())
}

fn seconds(duration: std::time::Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

fn write_host_rows(out: &mut dyn Write, host: &HostResult) -> io::Result<()> {
    if host.ports.is_empty() {
        writeln!(
            out,
            "  {:<39}  {}",
            style(host.address).white().bold(),
            style("no open ports among those requested").dim()
        )?;
        return Ok(());
    }
    writeln!(out, "  {}", style(host.address).white().bold())?;
    for port in &host.ports {
        let banner = truncate_string(&port.banner, 35);
        writeln!(
            out,
            "    {:>6}  {:^8}  {:<15}  {}",
            port.port,
            Style::new().green().bold().apply_to("open"),
            port.service,
            style(banner).dim()
        )?;
    }
    Ok(())
}

impl Plain for ScanResult {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        let title = if self.summary.total_ports == 0 {
            "Sweep Results"
        } else {
            "Discovery Results"
        };
        write_header(out, title)?;

        write_field(out, "Network:", &self.network)?;
        write_field(out, "Started:", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        write_partial_notice(out, self.complete)?;
        writeln!(out)?;

        let summary = &self.summary;
        writeln!(
            out,
            "  {} {} of {} hosts probed in {}",
            style("Statistics:").bold(),
            summary.hosts_scanned,
            summary.total_hosts,
            seconds(self.duration)
        )?;
        writeln!(
            out,
            "              {} live, {} open ports",
            style(summary.live_hosts).green().bold(),
            style(summary.open_ports).green()
        )?;
        writeln!(out)?;

        if self.hosts.is_empty() {
            writeln!(out, "  {}", style("No live hosts found.").dim())?;
        } else if summary.total_ports == 0 {
            writeln!(out, "  {}", style(THIN_RULE).dim())?;
            writeln!(
                out,
                "  {:<39}  {}",
                style("HOST").bold(),
                style("LATENCY").bold()
            )?;
            writeln!(out, "  {}", style(THIN_RULE).dim())?;
            for host in &self.hosts {
                writeln!(
                    out,
                    "  {:<39}  {}ms",
                    style(host.address).green(),
                    host.latency.as_millis()
                )?;
            }
            writeln!(out, "  {}", style(THIN_RULE).dim())?;
        } else {
            writeln!(out, "  {}", style(THIN_RULE).dim())?;
            for host in &self.hosts {
                write_host_rows(out, host)?;
            }
            writeln!(out, "  {}", style(THIN_RULE).dim())?;
        }

        write_footer(out)
    }
}

impl Plain for HostResult {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        write_header(out, "Port Scan Results")?;
        let state = if self.alive {
            style("up").green().bold()
        } else {
            style("no open ports").red()
        };
        write_field(out, "Host:", self.address)?;
        write_field(out, "State:", state)?;
        write_field(out, "Elapsed:", seconds(self.latency))?;
        writeln!(out)?;

        if !self.ports.is_empty() {
            writeln!(out, "  {}", style(THIN_RULE).dim())?;
            writeln!(
                out,
                "  {:>6}  {:^8}  {:<15}  {}",
                style("PORT").bold(),
                style("STATE").bold(),
                style("SERVICE").bold(),
                style("BANNER").bold()
            )?;
            writeln!(out, "  {}", style(THIN_RULE).dim())?;
            for port in &self.ports {
                writeln!(
                    out,
                    "  {:>6}  {:^8}  {:<15}  {}",
                    port.port,
                    Style::new().green().bold().apply_to("open"),
                    port.service,
                    style(truncate_string(&port.banner, 35)).dim()
                )?;
            }
            writeln!(out, "  {}", style(THIN_RULE).dim())?;
        }

        write_footer(out)
    }
}

impl Plain for MonitorTick {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{} #{} {}  {}/{} up ({})",
            style("•").dim(),
            self.sequence,
            self.checked_at.format("%H:%M:%S"),
            style(self.up_count()).green().bold(),
            self.hosts.len(),
            seconds(self.duration)
        )?;
        for host in &self.hosts {
            let state = if host.up {
                style("UP  ").green().bold()
            } else {
                style("DOWN").red().bold()
            };
            let ports = host
                .open_ports
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(",");
            writeln!(
                out,
                "    {}  {:<30}  {:<39}  {}",
                state,
                host.label,
                host.address,
                style(ports).dim()
            )?;
        }
        if !self.complete {
            writeln!(out, "    {}", style("check cut short at the interval").yellow())?;
        }
        Ok(())
    }
}

fn write_records(out: &mut dyn Write, records: &[crate::dns::DnsRecord]) -> io::Result<()> {
    for record in records {
        let priority = record
            .priority
            .map(|p| format!("{} ", p))
            .unwrap_or_default();
        writeln!(
            out,
            "    {:<6} {:>7}  {}{}",
            style(record.record_type).yellow(),
            record.ttl,
            priority,
            record.value
        )?;
    }
    Ok(())
}

impl Plain for QueryResult {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        write_header(out, "DNS Query")?;
        write_field(out, "Domain:", &self.domain)?;
        write_field(out, "Type:", self.record_type)?;
        write_field(out, "Nameserver:", &self.nameserver)?;
        write_field(out, "Response:", format!("{}ms", self.response_time.as_millis()))?;
        writeln!(out)?;
        if self.records.is_empty() {
            writeln!(out, "  {}", style("No records.").dim())?;
        } else {
            write_records(out, &self.records)?;
        }
        write_footer(out)
    }
}

impl Plain for PropagationResult {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        write_header(out, "Propagation Check")?;
        write_field(out, "Domain:", &self.domain)?;
        write_field(out, "Type:", self.record_type)?;
        write_field(
            out,
            "Answered:",
            format!("{} of {} nameservers", self.success_count, self.total_servers),
        )?;
        let verdict = if self.inconsistent {
            style("inconsistent").red().bold()
        } else {
            style("consistent").green().bold()
        };
        write_field(out, "Status:", verdict)?;
        writeln!(out)?;
        for (nameserver, records) in &self.results {
            writeln!(out, "  {}", style(nameserver).white().bold())?;
            write_records(out, records)?;
        }
        write_footer(out)
    }
}

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::High => Style::new().red().bold(),
        Severity::Medium => Style::new().yellow().bold(),
        Severity::Low => Style::new().dim(),
    }
}

impl Plain for ConsistencyReport {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        write_header(out, "Consistency Report")?;
        write_field(out, "Domain:", &self.domain)?;
        let checked = self
            .checked
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write_field(out, "Checked:", checked)?;
        writeln!(out)?;

        if self.issues.is_empty() {
            writeln!(out, "  {} {}", style("✓").green().bold(), "No issues found.")?;
        }
        for issue in &self.issues {
            writeln!(
                out,
                "  {:<6}  {:<5}  {}",
                severity_style(issue.severity).apply_to(issue.severity),
                issue.record_type,
                issue.description
            )?;
            if let Some(expected) = &issue.expected {
                writeln!(out, "                 {} {}", style("expected").dim(), expected)?;
            }
            if let Some(actual) = &issue.actual {
                writeln!(out, "                 {} {}", style("actual").dim(), actual)?;
            }
        }
        write_footer(out)
    }
}

fn yes_no(flag: bool) -> console::StyledObject<&'static str> {
    if flag {
        style("yes").green().bold()
    } else {
        style("no").red().bold()
    }
}

impl Plain for DnssecReport {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        write_header(out, "DNSSEC Check")?;
        write_field(out, "Domain:", &self.domain)?;
        write_field(out, "Nameserver:", &self.nameserver)?;
        write_field(out, "Delegated:", yes_no(self.delegated))?;
        write_field(out, "Signed:", yes_no(self.signed))?;
        let verdict = if self.valid {
            style("valid").green().bold()
        } else if self.signed {
            style("broken").red().bold()
        } else {
            style("unsigned").yellow().bold()
        };
        write_field(out, "Chain:", verdict)?;
        writeln!(out)?;

        for ds in &self.ds {
            writeln!(
                out,
                "  {:<6}  tag {:<5}  {:<16}  {} {}",
                style("DS").yellow(),
                ds.key_tag,
                algorithm_name(ds.algorithm),
                ds.digest_name(),
                style(truncate_string(&ds.digest, 24)).dim()
            )?;
        }
        for key in &self.dnskeys {
            writeln!(
                out,
                "  {:<6}  tag {:<5}  {:<16}  {} {} bits",
                style("DNSKEY").yellow(),
                key.key_tag,
                algorithm_name(key.algorithm),
                key.role(),
                key.key_length * 8
            )?;
        }
        for sig in &self.rrsigs {
            writeln!(
                out,
                "  {:<6}  tag {:<5}  {:<16}  {} until {} by {}",
                style("RRSIG").yellow(),
                sig.key_tag,
                algorithm_name(sig.algorithm),
                sig.type_covered,
                sig.expiration.format("%Y-%m-%d"),
                sig.signer_name
            )?;
        }
        if !self.errors.is_empty() {
            writeln!(out)?;
            for error in &self.errors {
                writeln!(out, "  {} {}", style("✗").red().bold(), error)?;
            }
        }
        write_footer(out)
    }
}

impl Plain for CertificateInfo {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        let cert = &self.certificate;
        write_header(out, "Certificate Check")?;
        write_field(out, "Target:", format!("{}:{}", self.host, self.port))?;
        write_field(out, "Subject:", &cert.subject)?;
        write_field(out, "Issuer:", &cert.issuer)?;
        if !cert.alt_names.is_empty() {
            write_field(out, "Names:", cert.alt_names.join(", "))?;
        }
        write_field(out, "Serial:", &cert.serial_number)?;
        write_field(out, "Signature:", &cert.signature_algorithm)?;
        writeln!(out)?;

        write_field(out, "Not before:", cert.not_before.format("%Y-%m-%d %H:%M:%S UTC"))?;
        write_field(out, "Not after:", cert.not_after.format("%Y-%m-%d %H:%M:%S UTC"))?;
        let remaining = if !cert.valid_now {
            style(format!("{} days (not valid now)", cert.days_remaining))
                .red()
                .bold()
        } else if cert.expires_soon() {
            style(format!("{} days", cert.days_remaining)).yellow().bold()
        } else {
            style(format!("{} days", cert.days_remaining)).green()
        };
        write_field(out, "Remaining:", remaining)?;
        writeln!(out)?;

        write_field(out, "Host match:", yes_no(self.host_matches))?;
        write_field(out, "Trusted:", yes_no(self.trusted))?;
        if let Some(reason) = &self.trust_error {
            writeln!(out, "              {}", style(reason).dim())?;
        }
        write_field(out, "Chain:", format!("{} certificates", self.chain_length))?;
        write_footer(out)
    }
}

/// One-line description of a successful bulk payload.
pub(crate) fn payload_detail(payload: &BulkPayload) -> String {
    match payload {
        BulkPayload::Query(result) => result
            .records
            .iter()
            .map(|r| r.value.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        BulkPayload::Propagation(result) => format!(
            "{}/{} answered, {}",
            result.success_count,
            result.total_servers,
            if result.inconsistent {
                "inconsistent"
            } else {
                "consistent"
            }
        ),
        BulkPayload::Consistency(report) => match report.worst() {
            Some(worst) => format!("{} issues, worst {}", report.issues.len(), worst),
            None => "no issues".to_string(),
        },
    }
}

impl Plain for BulkSummary {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        write_header(out, "Bulk Results")?;
        write_partial_notice(out, self.complete)?;
        writeln!(
            out,
            "  {} {} domains in {}",
            style("Statistics:").bold(),
            self.total_domains,
            seconds(self.duration)
        )?;
        writeln!(
            out,
            "              {} succeeded, {} failed",
            style(self.successful).green().bold(),
            style(self.failed).red()
        )?;
        writeln!(out)?;

        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        for result in &self.results {
            let (mark, detail) = match (&result.payload, &result.error) {
                (Some(payload), _) => (style("✓").green().bold(), payload_detail(payload)),
                (None, Some(error)) => (style("✗").red().bold(), error.clone()),
                (None, None) => (style("✗").red().bold(), String::new()),
            };
            writeln!(
                out,
                "  {} {:<40}  {}",
                mark,
                result.domain,
                style(truncate_string(&detail, 60)).dim()
            )?;
        }
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        write_footer(out)
    }
}

impl Plain for Vec<Nameserver> {
    fn write_plain(&self, out: &mut dyn Write) -> io::Result<()> {
        write_header(out, "Public Nameservers")?;
        writeln!(
            out,
            "  {:<12}  {:<18}  {}",
            style("PROVIDER").bold(),
            style("NAME").bold(),
            style("ADDRESS").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        for ns in self {
            writeln!(out, "  {:<12}  {:<18}  {}", ns.provider, ns.name, ns.address())?;
        }
        write_footer(out)
    }
}

/// Print the banner shown before a long-running command starts.
pub fn print_start_header(action: &str, target: &str, detail: &str) {
    eprintln!();
    eprintln!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("netsweep").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{} {}: {}", style("•").dim(), action, style(target).white().bold());
    if !detail.is_empty() {
        eprintln!("{} {}", style("•").dim(), detail);
    }
    eprintln!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Truncate a string to at most `max_len` characters, adding an ellipsis.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
