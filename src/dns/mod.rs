//! DNS operations: single queries, propagation, consistency and DNSSEC
//! checks, and bulk runs of those over domain lists.

pub mod bulk;
pub mod checker;
pub mod dnssec;
pub mod nameservers;
pub mod resolver;
pub mod traits;
pub mod types;

pub use bulk::{
    read_domains_file, BulkOperation, BulkPayload, BulkProcessor, BulkProgress,
    BulkProgressCallback, BulkResult, BulkSummary, BulkTask,
};
pub use dnssec::{DnskeyRecord, DnssecRecordType, DnssecReport, DsRecord, KeyRole, RrsigRecord};
pub use nameservers::Nameserver;
pub use resolver::{QueryOptions, Resolver};
pub use traits::DnsOperations;
pub use types::{
    ConsistencyIssue, ConsistencyReport, DnsRecord, DnsRecordType, IssueKind, PropagationResult,
    QueryResult, Severity,
};
