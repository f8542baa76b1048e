//! CSV output formatting.

use crate::dns::{
    BulkSummary, ConsistencyReport, DnssecReport, Nameserver, PropagationResult, QueryResult,
};
use crate::scanner::{HostResult, MonitorTick, ScanResult};
use crate::ssl::CertificateInfo;
use std::io::{self, Write};

/// Flat, row-per-item view of a result.
pub trait Tabular {
    fn header() -> &'static [&'static str];
    fn rows(&self) -> Vec<Vec<String>>;
}

const HOST_HEADER: &[&str] = &["host", "alive", "latency_ms", "port", "service", "banner"];

fn host_rows(host: &HostResult) -> Vec<Vec<String>> {
    let base = |port: String, service: &str, banner: &str| {
        vec![
            host.address.to_string(),
            host.alive.to_string(),
            host.latency.as_millis().to_string(),
            port,
            service.to_string(),
            banner.to_string(),
        ]
    };
    if host.ports.is_empty() {
        return vec![base(String::new(), "", "")];
    }
    host.ports
        .iter()
        .map(|p| base(p.port.to_string(), &p.service, &p.banner))
        .collect()
}

impl Tabular for ScanResult {
    fn header() -> &'static [&'static str] {
        HOST_HEADER
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.hosts.iter().flat_map(host_rows).collect()
    }
}

impl Tabular for HostResult {
    fn header() -> &'static [&'static str] {
        HOST_HEADER
    }

    fn rows(&self) -> Vec<Vec<String>> {
        host_rows(self)
    }
}

impl Tabular for MonitorTick {
    fn header() -> &'static [&'static str] {
        &["sequence", "checked_at", "label", "address", "up", "open_ports"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.hosts
            .iter()
            .map(|host| {
                vec![
                    self.sequence.to_string(),
                    self.checked_at.to_rfc3339(),
                    host.label.clone(),
                    host.address.to_string(),
                    host.up.to_string(),
                    host.open_ports
                        .iter()
                        .map(u16::to_string)
                        .collect::<Vec<_>>()
                        .join(";"),
                ]
            })
            .collect()
    }
}

impl Tabular for QueryResult {
    fn header() -> &'static [&'static str] {
        &["nameserver", "name", "type", "ttl", "priority", "value"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|r| {
                vec![
                    self.nameserver.clone(),
                    r.name.clone(),
                    r.record_type.to_string(),
                    r.ttl.to_string(),
                    r.priority.map_or(String::new(), |p| p.to_string()),
                    r.value.clone(),
                ]
            })
            .collect()
    }
}

impl Tabular for PropagationResult {
    fn header() -> &'static [&'static str] {
        QueryResult::header()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.results
            .iter()
            .flat_map(|(nameserver, records)| {
                records.iter().map(move |r| {
                    vec![
                        nameserver.clone(),
                        r.name.clone(),
                        r.record_type.to_string(),
                        r.ttl.to_string(),
                        r.priority.map_or(String::new(), |p| p.to_string()),
                        r.value.clone(),
                    ]
                })
            })
            .collect()
    }
}

impl Tabular for ConsistencyReport {
    fn header() -> &'static [&'static str] {
        &["domain", "severity", "kind", "type", "description", "servers"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.issues
            .iter()
            .map(|issue| {
                vec![
                    issue.domain.clone(),
                    issue.severity.to_string(),
                    issue.kind.to_string(),
                    issue.record_type.to_string(),
                    issue.description.clone(),
                    issue.servers.join(";"),
                ]
            })
            .collect()
    }
}

impl Tabular for BulkSummary {
    fn header() -> &'static [&'static str] {
        &["domain", "success", "duration_ms", "detail", "error"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.results
            .iter()
            .map(|result| {
                let elapsed = (result.finished_at - result.started_at).num_milliseconds();
                vec![
                    result.domain.clone(),
                    result.success.to_string(),
                    elapsed.max(0).to_string(),
                    result
                        .payload
                        .as_ref()
                        .map(super::plain::payload_detail)
                        .unwrap_or_default(),
                    result.error.clone().unwrap_or_default(),
                ]
            })
            .collect()
    }
}

impl Tabular for DnssecReport {
    fn header() -> &'static [&'static str] {
        &["domain", "nameserver", "record", "key_tag", "algorithm", "detail"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let row = |record: &str, key_tag: u16, algorithm: u8, detail: String| {
            vec![
                self.domain.clone(),
                self.nameserver.clone(),
                record.to_string(),
                key_tag.to_string(),
                algorithm.to_string(),
                detail,
            ]
        };
        let ds = self.ds.iter().map(|ds| {
            row("DS", ds.key_tag, ds.algorithm, format!("{} {}", ds.digest_name(), ds.digest))
        });
        let keys = self.dnskeys.iter().map(|key| {
            row("DNSKEY", key.key_tag, key.algorithm, format!("flags {}", key.flags))
        });
        let sigs = self.rrsigs.iter().map(|sig| {
            let detail = format!("{} until {}", sig.type_covered, sig.expiration.to_rfc3339());
            row("RRSIG", sig.key_tag, sig.algorithm, detail)
        });
        ds.chain(keys).chain(sigs).collect()
    }
}

impl Tabular for CertificateInfo {
    fn header() -> &'static [&'static str] {
        &[
            "host",
            "port",
            "common_name",
            "issuer",
            "not_after",
            "days_remaining",
            "host_matches",
            "trusted",
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let cert = &self.certificate;
        vec![vec![
            self.host.clone(),
            self.port.to_string(),
            cert.common_name.clone().unwrap_or_default(),
            cert.issuer.clone(),
            cert.not_after.to_rfc3339(),
            cert.days_remaining.to_string(),
            self.host_matches.to_string(),
            self.trusted.to_string(),
        ]]
    }
}

impl Tabular for Vec<Nameserver> {
    fn header() -> &'static [&'static str] {
        &["provider", "name", "address"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.iter()
            .map(|ns| vec![ns.provider.to_string(), ns.name.to_string(), ns.address()])
            .collect()
    }
}

/// Write rows as CSV, optionally preceded by the header.
pub fn write_csv<T: Tabular, W: Write>(value: &T, writer: W, with_header: bool) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if with_header {
        wtr.write_record(T::header())?;
    }
    for row in value.rows() {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Print results in CSV format.
pub fn print_csv<T: Tabular>(value: &T, with_header: bool) -> io::Result<()> {
    let stdout = io::stdout();
    write_csv(value, stdout.lock(), with_header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{PortProbeResult, ScanSummary};
    use crate::types::Port;
    use chrono::Utc;
    use std::time::Duration;

    fn csv_text<T: Tabular>(value: &T, with_header: bool) -> String {
        let mut buf = Vec::new();
        write_csv(value, &mut buf, with_header).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_scan_rows_include_portless_hosts() {
        let open = HostResult::alive("10.0.0.1".parse().unwrap(), Duration::from_millis(3))
            .with_ports(vec![
                PortProbeResult::open(Port::new(80).unwrap(), "HTTP"),
                PortProbeResult::open(Port::new(22).unwrap(), "SSH").with_banner("SSH-2.0, x"),
            ]);
        let quiet = HostResult::alive("10.0.0.2".parse().unwrap(), Duration::from_millis(5));
        let result = ScanResult {
            network: "10.0.0.0/30".to_string(),
            hosts: vec![open, quiet],
            started_at: Utc::now(),
            duration: Duration::from_secs(1),
            summary: ScanSummary::default(),
            complete: true,
        };

        let text = csv_text(&result, true);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "host,alive,latency_ms,port,service,banner");
        assert_eq!(lines[1], "10.0.0.1,true,3,22,SSH,\"SSH-2.0, x\"");
        assert_eq!(lines[2], "10.0.0.1,true,3,80,HTTP,");
        assert_eq!(lines[3], "10.0.0.2,true,5,,,");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_dnssec_rows_per_record() {
        use crate::dns::dnssec::{DnskeyRecord, DsRecord};

        let report = DnssecReport {
            domain: "example.com".to_string(),
            nameserver: "1.1.1.1".to_string(),
            delegated: true,
            signed: true,
            valid: true,
            errors: vec![],
            ds: vec![DsRecord {
                key_tag: 370,
                algorithm: 13,
                digest_type: 2,
                digest: "ab12".to_string(),
            }],
            dnskeys: vec![DnskeyRecord {
                flags: 257,
                protocol: 3,
                algorithm: 13,
                key_tag: 370,
                key_length: 64,
            }],
            rrsigs: vec![],
            checked_at: Utc::now(),
        };

        let text = csv_text(&report, true);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "domain,nameserver,record,key_tag,algorithm,detail");
        assert_eq!(lines[1], "example.com,1.1.1.1,DS,370,13,SHA-256 ab12");
        assert_eq!(lines[2], "example.com,1.1.1.1,DNSKEY,370,13,flags 257");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_header_can_be_skipped() {
        let host = HostResult::alive("10.0.0.9".parse().unwrap(), Duration::ZERO);
        let text = csv_text(&host, false);
        assert_eq!(text.trim_end(), "10.0.0.9,true,0,,,");
    }
}
