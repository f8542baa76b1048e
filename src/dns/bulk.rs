//! Bulk DNS processing over a list of domains.
//!
//! Each domain is an independent unit of work. A failing domain is recorded
//! on its [`BulkResult`] and never stops the rest of the run.

use crate::dns::traits::DnsOperations;
use crate::dns::types::{ConsistencyReport, DnsRecordType, PropagationResult, QueryResult};
use crate::error::{BulkError, DnsResult};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Longest name DNS allows in presentation form.
const MAX_DOMAIN_LEN: usize = 253;

/// Load domains from a file, one per line.
///
/// Blank lines and lines starting with `#` are skipped. The first invalid
/// name fails the whole load with its line number.
pub fn read_domains_file(path: &Path) -> Result<Vec<String>, BulkError> {
    let content = std::fs::read_to_string(path).map_err(|source| BulkError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut domains = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let domain = line.trim();
        if domain.is_empty() || domain.starts_with('#') {
            continue;
        }
        if !is_valid_domain(domain) {
            return Err(BulkError::InvalidDomain {
                line: index + 1,
                domain: domain.to_string(),
            });
        }
        domains.push(domain.to_string());
    }

    if domains.is_empty() {
        return Err(BulkError::NoDomains(path.to_path_buf()));
    }
    debug!(path = %path.display(), count = domains.len(), "loaded domain list");
    Ok(domains)
}

/// Character set, length, at least one dot, no leading or trailing `.`/`-`.
pub fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.len() <= MAX_DOMAIN_LEN
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && domain.contains('.')
        && !domain.starts_with(['.', '-'])
        && !domain.ends_with(['.', '-'])
}

/// What to do for each domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum BulkOperation {
    Query {
        record_type: DnsRecordType,
        nameserver: String,
    },
    Propagation {
        record_type: DnsRecordType,
        nameservers: Vec<String>,
    },
    Consistency {
        nameservers: Vec<String>,
    },
}

impl BulkOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Propagation { .. } => "propagation",
            Self::Consistency { .. } => "consistency",
        }
    }

    /// Worker count used when none is configured.
    pub fn default_concurrency(&self) -> usize {
        match self {
            Self::Query { .. } => 5,
            Self::Propagation { .. } => 3,
            Self::Consistency { .. } => 2,
        }
    }
}

/// One domain paired with the operation to run on it.
#[derive(Debug, Clone)]
pub struct BulkTask {
    pub domain: String,
    pub operation: BulkOperation,
}

impl BulkTask {
    /// Run the operation, turning any error into a failed result.
    pub async fn run<D: DnsOperations + ?Sized>(self, dns: &D) -> BulkResult {
        let started_at = Utc::now();
        let outcome: DnsResult<BulkPayload> = match &self.operation {
            BulkOperation::Query {
                record_type,
                nameserver,
            } => dns
                .query(&self.domain, *record_type, nameserver)
                .await
                .map(BulkPayload::Query),
            BulkOperation::Propagation {
                record_type,
                nameservers,
            } => dns
                .check_propagation(&self.domain, *record_type, nameservers)
                .await
                .map(BulkPayload::Propagation),
            BulkOperation::Consistency { nameservers } => dns
                .check_consistency(&self.domain, nameservers)
                .await
                .map(BulkPayload::Consistency),
        };

        let (payload, error) = match outcome {
            Ok(payload) => (Some(payload), None),
            Err(e) => {
                debug!(domain = %self.domain, error = %e, "bulk task failed");
                (None, Some(e.to_string()))
            }
        };
        BulkResult {
            domain: self.domain,
            success: error.is_none(),
            error,
            started_at,
            finished_at: Utc::now(),
            payload,
        }
    }
}

/// Operation-specific data of a successful task.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BulkPayload {
    Query(QueryResult),
    Propagation(PropagationResult),
    Consistency(ConsistencyReport),
}

/// Outcome for one domain.
#[derive(Debug, Clone, Serialize)]
pub struct BulkResult {
    pub domain: String,
    pub success: bool,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<BulkPayload>,
}

/// Totals for a bulk run.
#[derive(Debug, Clone, Serialize)]
pub struct BulkSummary {
    pub total_domains: usize,
    pub successful: usize,
    /// Includes domains never reached because the run was cancelled.
    pub failed: usize,
    #[serde(rename = "duration_ms", serialize_with = "crate::types::millis::serialize")]
    pub duration: Duration,
    /// In completion order.
    pub results: Vec<BulkResult>,
    pub complete: bool,
}

/// Reported after every finished domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkProgress {
    pub current: usize,
    pub total: usize,
    pub domain: String,
    pub success: bool,
}

pub type BulkProgressCallback = Arc<dyn Fn(&BulkProgress) + Send + Sync>;

/// Runs one operation over many domains with a flat worker limit.
pub struct BulkProcessor<D: DnsOperations> {
    dns: D,
    concurrency: usize,
    progress: Option<BulkProgressCallback>,
}

impl<D: DnsOperations> BulkProcessor<D> {
    pub fn new(dns: D, concurrency: usize) -> Self {
        Self {
            dns,
            concurrency: concurrency.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: BulkProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `operation` for every domain. Stops dispatching when `cancel` fires.
    pub async fn process(
        &self,
        domains: &[String],
        operation: &BulkOperation,
        cancel: &CancellationToken,
    ) -> BulkSummary {
        let clock = Instant::now();
        let total = domains.len();
        info!(
            operation = operation.name(),
            domains = total,
            concurrency = self.concurrency,
            "starting bulk run"
        );

        let dns = &self.dns;
        let mut finished = pin!(stream::iter(domains)
            .map(|domain| {
                let task = BulkTask {
                    domain: domain.clone(),
                    operation: operation.clone(),
                };
                task.run(dns)
            })
            .buffer_unordered(self.concurrency)
            .take_until(cancel.cancelled()));

        let mut results = Vec::with_capacity(total);
        while let Some(result) = finished.next().await {
            if let Some(callback) = &self.progress {
                callback(&BulkProgress {
                    current: results.len() + 1,
                    total,
                    domain: result.domain.clone(),
                    success: result.success,
                });
            }
            results.push(result);
        }

        let successful = results.iter().filter(|r| r.success).count();
        let summary = BulkSummary {
            total_domains: total,
            successful,
            failed: total - successful,
            duration: clock.elapsed(),
            complete: results.len() == total,
            results,
        };
        info!(
            successful = summary.successful,
            failed = summary.failed,
            complete = summary.complete,
            "bulk run finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::traits::mock::MockDns;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;
    use tokio::time::sleep;

    fn domains(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    fn query() -> BulkOperation {
        BulkOperation::Query {
            record_type: DnsRecordType::A,
            nameserver: "8.8.8.8".to_string(),
        }
    }

    fn write_list(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_domain_validation() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("a-b.example.co.uk"));
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain(".example.com"));
        assert!(!is_valid_domain("example.com."));
        assert!(!is_valid_domain("-example.com"));
        assert!(!is_valid_domain("exa mple.com"));
        assert!(!is_valid_domain("exämple.com"));
        assert!(!is_valid_domain(&format!("{}.com", "a".repeat(250))));
    }

    #[test]
    fn test_read_skips_comments_and_blanks() {
        let file = write_list("# zone list\nexample.com\n\n  example.org  \n# end\n");
        assert_eq!(
            read_domains_file(file.path()).unwrap(),
            vec!["example.com", "example.org"]
        );
    }

    #[test]
    fn test_read_reports_line_number() {
        let file = write_list("example.com\n\nnot_valid\n");
        match read_domains_file(file.path()) {
            Err(BulkError::InvalidDomain { line, domain }) => {
                assert_eq!(line, 3);
                assert_eq!(domain, "not_valid");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_read_empty_list_fails() {
        let file = write_list("# nothing here\n\n");
        assert!(matches!(
            read_domains_file(file.path()),
            Err(BulkError::NoDomains(_))
        ));
    }

    #[test]
    fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.txt");
        assert!(matches!(
            read_domains_file(&missing),
            Err(BulkError::Unreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_batch() {
        let list = domains(&["one.com", "two.com", "three.com", "four.com", "five.com"]);
        let dns = MockDns::default().failing("three.com");
        let processor = BulkProcessor::new(dns, 5);

        let summary = processor
            .process(&list, &query(), &CancellationToken::new())
            .await;

        assert_eq!(summary.total_domains, 5);
        assert_eq!(summary.successful, 4);
        assert_eq!(summary.failed, 1);
        assert!(summary.complete);

        let third = summary.results.iter().find(|r| r.domain == "three.com").unwrap();
        assert!(!third.success);
        assert!(third.error.as_deref().unwrap().contains("SERVFAIL"));
        assert!(third.payload.is_none());
    }

    #[tokio::test]
    async fn test_progress_after_every_domain() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let processor = BulkProcessor::new(MockDns::default().failing("b.com"), 2)
            .with_progress(Arc::new(move |p: &BulkProgress| sink.lock().unwrap().push(p.clone())));

        processor
            .process(&domains(&["a.com", "b.com", "c.com"]), &query(), &CancellationToken::new())
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.iter().map(|p| p.current).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(seen.iter().all(|p| p.total == 3));
        assert_eq!(seen.iter().filter(|p| !p.success).count(), 1);
    }

    #[tokio::test]
    async fn test_propagation_payload() {
        let dns = MockDns::default()
            .answer("a.com", DnsRecordType::Mx, "8.8.8.8", &["mx1.a.com."])
            .answer("a.com", DnsRecordType::Mx, "1.1.1.1", &["mx1.a.com."]);
        let operation = BulkOperation::Propagation {
            record_type: DnsRecordType::Mx,
            nameservers: domains(&["8.8.8.8", "1.1.1.1"]),
        };
        let summary = BulkProcessor::new(dns, 3)
            .process(&domains(&["a.com"]), &operation, &CancellationToken::new())
            .await;

        match &summary.results[0].payload {
            Some(BulkPayload::Propagation(p)) => {
                assert_eq!(p.success_count, 2);
                assert!(!p.inconsistent);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_counts_unreached_as_failed() {
        let dns = MockDns {
            delay: Duration::from_millis(40),
            ..MockDns::default()
        };
        let processor = BulkProcessor::new(dns, 1);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(60)).await;
            trigger.cancel();
        });

        let list = domains(&["a.com", "b.com", "c.com", "d.com", "e.com"]);
        let summary = processor.process(&list, &query(), &cancel).await;

        assert!(!summary.complete);
        assert!(summary.results.len() < 5);
        assert_eq!(summary.failed, 5 - summary.successful);
    }

    #[test]
    fn test_default_concurrency() {
        assert_eq!(query().default_concurrency(), 5);
        assert_eq!(
            BulkOperation::Consistency { nameservers: vec![] }.default_concurrency(),
            2
        );
    }
}
