//! DNS record and result types.

use crate::error::DnsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use trust_dns_resolver::proto::rr::RecordType;

/// Record types the resolver can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Txt,
    Soa,
    Ptr,
    Srv,
}

impl DnsRecordType {
    pub const ALL: [Self; 9] = [
        Self::A,
        Self::Aaaa,
        Self::Cname,
        Self::Mx,
        Self::Ns,
        Self::Txt,
        Self::Soa,
        Self::Ptr,
        Self::Srv,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Ns => "NS",
            Self::Txt => "TXT",
            Self::Soa => "SOA",
            Self::Ptr => "PTR",
            Self::Srv => "SRV",
        }
    }

    pub(crate) fn to_record_type(self) -> RecordType {
        match self {
            Self::A => RecordType::A,
            Self::Aaaa => RecordType::AAAA,
            Self::Cname => RecordType::CNAME,
            Self::Mx => RecordType::MX,
            Self::Ns => RecordType::NS,
            Self::Txt => RecordType::TXT,
            Self::Soa => RecordType::SOA,
            Self::Ptr => RecordType::PTR,
            Self::Srv => RecordType::SRV,
        }
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DnsRecordType {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DnsError::UnsupportedRecordType(wanted.to_string()))
    }
}

/// One answer record, flattened to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    pub value: String,
    pub ttl: u32,
    /// MX preference or SRV priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

/// Answer from one nameserver for one question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub domain: String,
    pub record_type: DnsRecordType,
    pub nameserver: String,
    pub records: Vec<DnsRecord>,
    #[serde(rename = "response_time_ms", serialize_with = "crate::types::millis::serialize")]
    pub response_time: Duration,
    pub queried_at: DateTime<Utc>,
}

/// The same question asked of several nameservers.
#[derive(Debug, Clone, Serialize)]
pub struct PropagationResult {
    pub domain: String,
    pub record_type: DnsRecordType,
    /// Records per nameserver, for servers that returned any.
    pub results: BTreeMap<String, Vec<DnsRecord>>,
    /// Two answering servers returned different value sets.
    pub inconsistent: bool,
    pub total_servers: usize,
    pub success_count: usize,
    pub checked_at: DateTime<Utc>,
}

impl PropagationResult {
    pub fn new(
        domain: &str,
        record_type: DnsRecordType,
        results: BTreeMap<String, Vec<DnsRecord>>,
        total_servers: usize,
    ) -> Self {
        let inconsistent = values_differ(&results);
        Self {
            domain: domain.to_string(),
            record_type,
            success_count: results.len(),
            results,
            inconsistent,
            total_servers,
            checked_at: Utc::now(),
        }
    }
}

fn values_differ(results: &BTreeMap<String, Vec<DnsRecord>>) -> bool {
    let mut sets = results
        .values()
        .map(|records| records.iter().map(|r| r.value.as_str()).collect::<BTreeSet<_>>());
    match sets.next() {
        Some(first) => sets.any(|set| set != first),
        None => false,
    }
}

/// How bad a consistency issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// What a consistency issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    PropagationInconsistency,
    MxPriorityZero,
    InsufficientNameservers,
    TxtRecordTooLong,
    MultipleSpfRecords,
    SpfRecordTooLong,
    SpfTooManyLookups,
    DmarcMissingPolicy,
    DmarcWeakPolicy,
    DkimMissingPublicKey,
    DkimRevokedKey,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PropagationInconsistency => "propagation_inconsistency",
            Self::MxPriorityZero => "mx_priority_zero",
            Self::InsufficientNameservers => "insufficient_nameservers",
            Self::TxtRecordTooLong => "txt_record_too_long",
            Self::MultipleSpfRecords => "multiple_spf_records",
            Self::SpfRecordTooLong => "spf_record_too_long",
            Self::SpfTooManyLookups => "spf_too_many_lookups",
            Self::DmarcMissingPolicy => "dmarc_missing_policy",
            Self::DmarcWeakPolicy => "dmarc_weak_policy",
            Self::DkimMissingPublicKey => "dkim_missing_public_key",
            Self::DkimRevokedKey => "dkim_revoked_key",
        };
        f.write_str(name)
    }
}

/// A problem found while checking a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyIssue {
    pub kind: IssueKind,
    pub domain: String,
    pub record_type: DnsRecordType,
    pub description: String,
    pub severity: Severity,
    pub servers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

/// Everything found for one domain.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub domain: String,
    /// Record types that at least one nameserver answered.
    pub checked: Vec<DnsRecordType>,
    pub issues: Vec<ConsistencyIssue>,
}

impl ConsistencyReport {
    pub fn worst(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str) -> DnsRecord {
        DnsRecord {
            name: "example.com.".to_string(),
            record_type: DnsRecordType::A,
            value: value.to_string(),
            ttl: 300,
            priority: None,
        }
    }

    #[test]
    fn test_record_type_parse() {
        assert_eq!("mx".parse::<DnsRecordType>().unwrap(), DnsRecordType::Mx);
        assert_eq!(" AAAA ".parse::<DnsRecordType>().unwrap(), DnsRecordType::Aaaa);
        assert!(matches!(
            "AXFR".parse::<DnsRecordType>(),
            Err(DnsError::UnsupportedRecordType(_))
        ));
    }

    #[test]
    fn test_record_type_serializes_uppercase() {
        assert_eq!(serde_json::to_value(DnsRecordType::Aaaa).unwrap(), "AAAA");
        assert_eq!(DnsRecordType::Srv.to_string(), "SRV");
    }

    #[test]
    fn test_propagation_agreement() {
        let mut results = BTreeMap::new();
        results.insert("8.8.8.8".to_string(), vec![record("1.2.3.4"), record("1.2.3.5")]);
        results.insert("1.1.1.1".to_string(), vec![record("1.2.3.5"), record("1.2.3.4")]);
        let propagation = PropagationResult::new("example.com", DnsRecordType::A, results, 3);
        assert!(!propagation.inconsistent);
        assert_eq!(propagation.success_count, 2);
        assert_eq!(propagation.total_servers, 3);
    }

    #[test]
    fn test_propagation_disagreement() {
        let mut results = BTreeMap::new();
        results.insert("8.8.8.8".to_string(), vec![record("1.2.3.4")]);
        results.insert("1.1.1.1".to_string(), vec![record("5.6.7.8")]);
        let propagation = PropagationResult::new("example.com", DnsRecordType::A, results, 2);
        assert!(propagation.inconsistent);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
