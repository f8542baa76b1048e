//! DNS operation abstraction.
//!
//! Bulk processing and the CLI only see [`DnsOperations`]. Implementors
//! provide `query` and `query_dnssec`; propagation, consistency and DNSSEC
//! checks are built on top of them, so scripted answers are enough to test
//! them.

use crate::dns::checker::{self, CHECKED_TYPES};
use crate::dns::dnssec::{self, DnssecAnswers, DnssecRecordType, DnssecReport};
use crate::dns::types::{ConsistencyReport, DnsRecordType, PropagationResult, QueryResult};
use crate::error::{DnsError, DnsResult};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::debug;

#[async_trait]
pub trait DnsOperations: Send + Sync {
    /// Ask one nameserver one question. An empty answer is a success.
    async fn query(
        &self,
        domain: &str,
        record_type: DnsRecordType,
        nameserver: &str,
    ) -> DnsResult<QueryResult>;

    /// Fetch the raw RDATA of every `record_type` record for `domain`.
    async fn query_dnssec(
        &self,
        domain: &str,
        record_type: DnssecRecordType,
        nameserver: &str,
    ) -> DnsResult<Vec<Vec<u8>>>;

    /// Ask every nameserver the same question concurrently.
    ///
    /// Fails only when none of them answered.
    async fn check_propagation(
        &self,
        domain: &str,
        record_type: DnsRecordType,
        nameservers: &[String],
    ) -> DnsResult<PropagationResult> {
        if nameservers.is_empty() {
            return Err(DnsError::NoNameservers);
        }

        let answers =
            join_all(nameservers.iter().map(|ns| self.query(domain, record_type, ns))).await;

        let mut answered = 0;
        let mut results = BTreeMap::new();
        for (nameserver, answer) in nameservers.iter().zip(answers) {
            match answer {
                Ok(answer) => {
                    answered += 1;
                    if !answer.records.is_empty() {
                        results.insert(nameserver.clone(), answer.records);
                    }
                }
                Err(e) => debug!(%nameserver, error = %e, "nameserver did not answer"),
            }
        }

        if answered == 0 {
            return Err(DnsError::NoAnswer(domain.to_string()));
        }
        Ok(PropagationResult::new(
            domain,
            record_type,
            results,
            nameservers.len(),
        ))
    }

    /// Check A, AAAA, MX, NS and TXT across `nameservers` and apply the
    /// consistency rules. Record types nobody answered are skipped; if all
    /// of them are, the check fails.
    async fn check_consistency(
        &self,
        domain: &str,
        nameservers: &[String],
    ) -> DnsResult<ConsistencyReport> {
        let mut report = ConsistencyReport {
            domain: domain.to_string(),
            checked: Vec::new(),
            issues: Vec::new(),
        };

        for record_type in CHECKED_TYPES {
            match self.check_propagation(domain, record_type, nameservers).await {
                Ok(propagation) => {
                    report.checked.push(record_type);
                    report.issues.extend(checker::inspect(&propagation));
                }
                Err(DnsError::NoNameservers) => return Err(DnsError::NoNameservers),
                Err(e) => debug!(%domain, %record_type, error = %e, "skipping record type"),
            }
        }

        if report.checked.is_empty() {
            return Err(DnsError::NoAnswer(domain.to_string()));
        }
        Ok(report)
    }

    /// Fetch DS, DNSKEY and RRSIG records for `domain` from one nameserver
    /// and check the chain of trust.
    ///
    /// Individual query failures are recorded on the report. Fails only when
    /// the nameserver is unusable or none of the queries succeeded.
    async fn verify_dnssec(&self, domain: &str, nameserver: &str) -> DnsResult<DnssecReport> {
        let ds = if dnssec::has_parent(domain) {
            Some(self.query_dnssec(domain, DnssecRecordType::Ds, nameserver).await)
        } else {
            None
        };
        let dnskey = self.query_dnssec(domain, DnssecRecordType::Dnskey, nameserver).await;
        let rrsig = self.query_dnssec(domain, DnssecRecordType::Rrsig, nameserver).await;

        let answers = ds.iter().chain([&dnskey, &rrsig]);
        let mut answered = false;
        for answer in answers {
            match answer {
                Ok(_) => answered = true,
                Err(DnsError::InvalidNameserver(ns)) => {
                    return Err(DnsError::InvalidNameserver(ns.clone()))
                }
                Err(_) => {}
            }
        }
        if !answered {
            return Err(DnsError::NoAnswer(domain.to_string()));
        }

        let reason = |answer: DnsResult<Vec<Vec<u8>>>| answer.map_err(|e| e.to_string());
        let answers = DnssecAnswers {
            ds: ds.map(reason),
            dnskey: reason(dnskey),
            rrsig: reason(rrsig),
        };
        let report = DnssecReport::assemble(domain, nameserver, answers, Utc::now());
        debug!(%domain, %nameserver, valid = report.valid, "DNSSEC check finished");
        Ok(report)
    }
}
