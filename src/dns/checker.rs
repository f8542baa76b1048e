//! Consistency rules applied to propagation results.

use crate::dns::types::{ConsistencyIssue, DnsRecordType, IssueKind, PropagationResult, Severity};

/// Longest TXT string a single character-string can carry.
const TXT_MAX_LEN: usize = 255;

/// DNS lookups an SPF evaluation may trigger.
const SPF_LOOKUP_LIMIT: usize = 10;

const SPF_LOOKUP_MECHANISMS: [&str; 4] = ["include:", "a:", "mx:", "exists:"];

/// Record types checked for every domain.
pub const CHECKED_TYPES: [DnsRecordType; 5] = [
    DnsRecordType::A,
    DnsRecordType::Aaaa,
    DnsRecordType::Mx,
    DnsRecordType::Ns,
    DnsRecordType::Txt,
];

fn inconsistency_severity(record_type: DnsRecordType) -> Severity {
    match record_type {
        DnsRecordType::A | DnsRecordType::Aaaa => Severity::High,
        DnsRecordType::Mx | DnsRecordType::Ns => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Small builder so each rule reads as one expression.
struct Finding<'a> {
    propagation: &'a PropagationResult,
    server: &'a str,
}

impl Finding<'_> {
    fn issue(
        &self,
        kind: IssueKind,
        severity: Severity,
        description: &str,
        actual: impl Into<String>,
    ) -> ConsistencyIssue {
        ConsistencyIssue {
            kind,
            domain: self.propagation.domain.clone(),
            record_type: self.propagation.record_type,
            description: description.to_string(),
            severity,
            servers: vec![self.server.to_string()],
            expected: None,
            actual: Some(actual.into()),
        }
    }
}

/// Run every rule that applies to `propagation`'s record type.
pub fn inspect(propagation: &PropagationResult) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();

    if propagation.inconsistent {
        issues.push(ConsistencyIssue {
            kind: IssueKind::PropagationInconsistency,
            domain: propagation.domain.clone(),
            record_type: propagation.record_type,
            description: format!(
                "{} records are inconsistent across nameservers",
                propagation.record_type
            ),
            severity: inconsistency_severity(propagation.record_type),
            servers: propagation.results.keys().cloned().collect(),
            expected: None,
            actual: None,
        });
    }

    for (server, records) in &propagation.results {
        let finding = Finding {
            propagation,
            server,
        };
        match propagation.record_type {
            DnsRecordType::Mx => {
                for record in records.iter().filter(|r| r.priority == Some(0)) {
                    issues.push(finding.issue(
                        IssueKind::MxPriorityZero,
                        Severity::Medium,
                        "MX record has priority 0, which may cause mail delivery issues",
                        format!("{} priority 0", record.value),
                    ));
                }
            }
            DnsRecordType::Ns if records.len() < 2 => {
                issues.push(finding.issue(
                    IssueKind::InsufficientNameservers,
                    Severity::High,
                    "Domain has fewer than 2 nameservers",
                    format!("count: {}", records.len()),
                ));
            }
            DnsRecordType::Txt => {
                for record in records {
                    issues.extend(check_txt(&finding, &record.name, &record.value));
                }
            }
            _ => {}
        }
    }

    issues
}

fn check_txt(finding: &Finding<'_>, name: &str, value: &str) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();

    if value.len() > TXT_MAX_LEN {
        issues.push(finding.issue(
            IssueKind::TxtRecordTooLong,
            Severity::Low,
            "TXT record exceeds recommended length of 255 characters",
            format!("length: {}", value.len()),
        ));
    }
    if value.starts_with("v=spf1") {
        issues.extend(check_spf(finding, value));
    }
    if value.starts_with("v=DMARC1") {
        issues.extend(check_dmarc(finding, value));
    }
    if name.contains("_domainkey") {
        issues.extend(check_dkim(finding, value));
    }

    issues
}

fn check_spf(finding: &Finding<'_>, spf: &str) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();

    if spf.matches("v=spf1").count() > 1 {
        issues.push(finding.issue(
            IssueKind::MultipleSpfRecords,
            Severity::High,
            "Multiple SPF records detected, which can cause email delivery issues",
            spf,
        ));
    }
    if spf.len() > TXT_MAX_LEN {
        issues.push(finding.issue(
            IssueKind::SpfRecordTooLong,
            Severity::Medium,
            "SPF record is too long and may be truncated",
            format!("length: {}", spf.len()),
        ));
    }

    let lookups: usize = SPF_LOOKUP_MECHANISMS
        .iter()
        .map(|mechanism| spf.matches(mechanism).count())
        .sum();
    if lookups > SPF_LOOKUP_LIMIT {
        let mut issue = finding.issue(
            IssueKind::SpfTooManyLookups,
            Severity::High,
            "SPF record exceeds the 10 DNS lookup limit",
            format!("lookups: {}", lookups),
        );
        issue.expected = Some(format!("{} or fewer", SPF_LOOKUP_LIMIT));
        issues.push(issue);
    }

    issues
}

fn check_dmarc(finding: &Finding<'_>, dmarc: &str) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();

    if !dmarc.contains("p=") {
        issues.push(finding.issue(
            IssueKind::DmarcMissingPolicy,
            Severity::High,
            "DMARC record is missing the required policy (p=) tag",
            dmarc,
        ));
    }
    if dmarc.contains("p=none") {
        let mut issue = finding.issue(
            IssueKind::DmarcWeakPolicy,
            Severity::Medium,
            "DMARC policy is 'none' and provides no protection",
            "p=none",
        );
        issue.expected = Some("p=quarantine or p=reject".to_string());
        issues.push(issue);
    }

    issues
}

fn check_dkim(finding: &Finding<'_>, dkim: &str) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();

    if !dkim.contains("p=") {
        issues.push(finding.issue(
            IssueKind::DkimMissingPublicKey,
            Severity::High,
            "DKIM record is missing the public key (p=) tag",
            dkim,
        ));
    }
    let revoked =
        dkim.contains("p=;") || dkim.contains("p=\"\";") || dkim.trim_end().ends_with("p=");
    if revoked {
        issues.push(finding.issue(
            IssueKind::DkimRevokedKey,
            Severity::Medium,
            "DKIM key appears to be revoked (empty public key)",
            "empty public key",
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::types::DnsRecord;
    use std::collections::BTreeMap;

    fn propagation(
        record_type: DnsRecordType,
        servers: &[(&str, Vec<(&str, &str, Option<u16>)>)],
    ) -> PropagationResult {
        let results: BTreeMap<String, Vec<DnsRecord>> = servers
            .iter()
            .map(|(server, records)| {
                let records = records
                    .iter()
                    .map(|(name, value, priority)| DnsRecord {
                        name: name.to_string(),
                        record_type,
                        value: value.to_string(),
                        ttl: 300,
                        priority: *priority,
                    })
                    .collect();
                (server.to_string(), records)
            })
            .collect();
        PropagationResult::new("example.com", record_type, results, servers.len())
    }

    fn kinds(issues: &[ConsistencyIssue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_clean_a_records() {
        let p = propagation(
            DnsRecordType::A,
            &[
                ("8.8.8.8", vec![("example.com.", "93.184.216.34", None)]),
                ("1.1.1.1", vec![("example.com.", "93.184.216.34", None)]),
            ],
        );
        assert!(inspect(&p).is_empty());
    }

    #[test]
    fn test_inconsistent_a_is_high() {
        let p = propagation(
            DnsRecordType::A,
            &[
                ("8.8.8.8", vec![("example.com.", "1.1.1.1", None)]),
                ("1.1.1.1", vec![("example.com.", "2.2.2.2", None)]),
            ],
        );
        let issues = inspect(&p);
        assert_eq!(kinds(&issues), vec![IssueKind::PropagationInconsistency]);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].servers.len(), 2);
    }

    #[test]
    fn test_mx_priority_zero() {
        let p = propagation(
            DnsRecordType::Mx,
            &[("8.8.8.8", vec![("example.com.", "mail.example.com.", Some(0))])],
        );
        assert_eq!(kinds(&inspect(&p)), vec![IssueKind::MxPriorityZero]);
    }

    #[test]
    fn test_single_nameserver() {
        let p = propagation(
            DnsRecordType::Ns,
            &[("8.8.8.8", vec![("example.com.", "ns1.example.com.", None)])],
        );
        let issues = inspect(&p);
        assert_eq!(kinds(&issues), vec![IssueKind::InsufficientNameservers]);
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[test]
    fn test_spf_rules() {
        let includes = (0..11).map(|i| format!("include:s{}.io", i)).collect::<Vec<_>>();
        let spf = format!("v=spf1 {} -all", includes.join(" "));
        let p = propagation(
            DnsRecordType::Txt,
            &[("8.8.8.8", vec![("example.com.", spf.as_str(), None)])],
        );
        assert_eq!(kinds(&inspect(&p)), vec![IssueKind::SpfTooManyLookups]);

        let doubled = "v=spf1 -all v=spf1 ~all";
        let p = propagation(
            DnsRecordType::Txt,
            &[("8.8.8.8", vec![("example.com.", doubled, None)])],
        );
        assert_eq!(kinds(&inspect(&p)), vec![IssueKind::MultipleSpfRecords]);
    }

    #[test]
    fn test_long_spf_flags_both_lengths() {
        let spf = format!("v=spf1 ip4:10.0.0.1 {}", "x".repeat(260));
        let p = propagation(
            DnsRecordType::Txt,
            &[("8.8.8.8", vec![("example.com.", spf.as_str(), None)])],
        );
        assert_eq!(
            kinds(&inspect(&p)),
            vec![IssueKind::TxtRecordTooLong, IssueKind::SpfRecordTooLong]
        );
    }

    #[test]
    fn test_dmarc_rules() {
        let p = propagation(
            DnsRecordType::Txt,
            &[("8.8.8.8", vec![("_dmarc.example.com.", "v=DMARC1; p=none", None)])],
        );
        assert_eq!(kinds(&inspect(&p)), vec![IssueKind::DmarcWeakPolicy]);

        let p = propagation(
            DnsRecordType::Txt,
            &[(
                "8.8.8.8",
                vec![("_dmarc.example.com.", "v=DMARC1; rua=mailto:x@example.com", None)],
            )],
        );
        assert_eq!(kinds(&inspect(&p)), vec![IssueKind::DmarcMissingPolicy]);
    }

    #[test]
    fn test_dkim_rules() {
        let name = "sel._domainkey.example.com.";
        let dkim = |value: &str| {
            propagation(DnsRecordType::Txt, &[("8.8.8.8", vec![(name, value, None)])])
        };

        let p = dkim("v=DKIM1; k=rsa; p=;");
        assert_eq!(kinds(&inspect(&p)), vec![IssueKind::DkimRevokedKey]);

        let p = dkim("v=DKIM1; k=rsa");
        assert_eq!(kinds(&inspect(&p)), vec![IssueKind::DkimMissingPublicKey]);

        let p = dkim("v=DKIM1; p=MIGfMA0");
        assert!(inspect(&p).is_empty());
    }
}
