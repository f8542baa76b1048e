//! Resolver backed by `trust-dns-resolver`.
//!
//! Every query goes to one explicitly named nameserver with recursion
//! requested, never to the system resolver, so answers from different
//! servers can be compared.

use crate::dns::dnssec::DnssecRecordType;
use crate::dns::traits::DnsOperations;
use crate::dns::types::{DnsRecord, DnsRecordType, QueryResult};
use crate::error::{DnsError, DnsResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::rr::{RData, Record, RecordType};
use trust_dns_resolver::proto::serialize::binary::BinEncodable;
use trust_dns_resolver::TokioAsyncResolver;

const DNS_PORT: u16 = 53;

/// Per-query settings.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub timeout: Duration,
    pub attempts: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            attempts: 3,
        }
    }
}

/// Queries named nameservers directly.
///
/// One underlying resolver is kept per nameserver address, with caching
/// disabled so repeated checks see fresh answers.
pub struct Resolver {
    options: QueryOptions,
    clients: Mutex<HashMap<SocketAddr, TokioAsyncResolver>>,
}

impl Resolver {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            options,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client(&self, nameserver: SocketAddr) -> TokioAsyncResolver {
        let mut clients = match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        clients
            .entry(nameserver)
            .or_insert_with(|| {
                let group = NameServerConfigGroup::from_ips_clear(
                    &[nameserver.ip()],
                    nameserver.port(),
                    true,
                );
                let config = ResolverConfig::from_parts(None, vec![], group);

                let mut opts = ResolverOpts::default();
                opts.timeout = self.options.timeout;
                opts.attempts = self.options.attempts;
                opts.cache_size = 0;
                opts.use_hosts_file = false;

                TokioAsyncResolver::tokio(config, opts)
            })
            .clone()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}

/// Parse `ip` or `ip:port` (IPv6 with a port as `[::1]:53`).
pub fn parse_nameserver(nameserver: &str) -> DnsResult<SocketAddr> {
    let nameserver = nameserver.trim();
    if let Ok(ip) = nameserver.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DNS_PORT));
    }
    nameserver
        .parse::<SocketAddr>()
        .map_err(|_| DnsError::InvalidNameserver(nameserver.to_string()))
}

/// Flatten one answer record into text.
fn to_record(record: &Record, record_type: DnsRecordType) -> Option<DnsRecord> {
    let (value, priority) = match record.data()? {
        RData::A(a) => (a.0.to_string(), None),
        RData::AAAA(aaaa) => (aaaa.0.to_string(), None),
        RData::CNAME(cname) => (cname.0.to_string(), None),
        RData::NS(ns) => (ns.0.to_string(), None),
        RData::PTR(ptr) => (ptr.0.to_string(), None),
        RData::MX(mx) => (mx.exchange().to_string(), Some(mx.preference())),
        RData::SRV(srv) => (srv.target().to_string(), Some(srv.priority())),
        RData::TXT(txt) => {
            let parts: Vec<String> = txt
                .iter()
                .map(|part| String::from_utf8_lossy(part).into_owned())
                .collect();
            (parts.join(" "), None)
        }
        RData::SOA(soa) => (
            format!(
                "{} {} {} {} {} {} {}",
                soa.mname(),
                soa.rname(),
                soa.serial(),
                soa.refresh(),
                soa.retry(),
                soa.expire(),
                soa.minimum()
            ),
            None,
        ),
        other => (other.to_string(), None),
    };

    Some(DnsRecord {
        name: record.name().to_string(),
        record_type,
        value,
        ttl: record.ttl(),
        priority,
    })
}

/// RDATA of one answer record in wire format.
fn wire_rdata(record: &Record) -> Option<Vec<u8>> {
    record.data()?.to_bytes().ok()
}

impl Resolver {
    /// Answers of exactly `record_type`; an empty answer is `Ok`.
    async fn lookup_records(
        &self,
        domain: &str,
        record_type: RecordType,
        nameserver: &str,
    ) -> DnsResult<Vec<Record>> {
        let server = parse_nameserver(nameserver)?;
        let client = self.client(server);
        match client.lookup(domain, record_type).await {
            Ok(lookup) => Ok(lookup
                .record_iter()
                // A CNAME chain comes back with the target's records; keep the asked-for type.
                .filter(|r| r.record_type() == record_type)
                .cloned()
                .collect()),
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
                _ => Err(query_failed(domain, &e)),
            },
        }
    }
}

fn query_failed(domain: &str, e: &ResolveError) -> DnsError {
    DnsError::QueryFailed {
        domain: domain.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl DnsOperations for Resolver {
    async fn query(
        &self,
        domain: &str,
        record_type: DnsRecordType,
        nameserver: &str,
    ) -> DnsResult<QueryResult> {
        let queried_at = Utc::now();
        let clock = Instant::now();

        let records = self
            .lookup_records(domain, record_type.to_record_type(), nameserver)
            .await?
            .iter()
            .filter_map(|r| to_record(r, record_type))
            .collect();

        Ok(QueryResult {
            domain: domain.to_string(),
            record_type,
            nameserver: nameserver.to_string(),
            records,
            response_time: clock.elapsed(),
            queried_at,
        })
    }

    async fn query_dnssec(
        &self,
        domain: &str,
        record_type: DnssecRecordType,
        nameserver: &str,
    ) -> DnsResult<Vec<Vec<u8>>> {
        let records = self
            .lookup_records(domain, record_type.to_record_type(), nameserver)
            .await?;
        Ok(records.iter().filter_map(wire_rdata).collect())
    }
}
