//! Bulk subcommand implementation.
//!
//! Handles `netsweep bulk` for running one DNS check over a domain list.

use super::dns::resolver;
use super::progress::bulk_bar;
use super::Context;
use crate::config::AppSettings;
use crate::dns::{nameservers, read_domains_file, BulkOperation, BulkProcessor, DnsRecordType};
use crate::error::CliResult;
use crate::output;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DNS checks for every domain in a file.
#[derive(Parser, Debug)]
pub struct BulkCommand {
    #[command(subcommand)]
    pub action: BulkAction,
}

/// Bulk actions. Each takes a file with one domain per line; blank lines
/// and lines starting with `#` are skipped.
#[derive(Subcommand, Debug)]
pub enum BulkAction {
    /// Query every domain against one nameserver
    Query {
        /// File with one domain per line
        file: PathBuf,

        /// Record type
        #[arg(short = 't', long = "type", default_value = "A")]
        record_type: DnsRecordType,

        /// Nameserver address, "ip" or "ip:port"
        #[arg(short = 'n', long, default_value = "8.8.8.8")]
        nameserver: String,

        /// Domains processed at once
        #[arg(short, long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Check propagation of every domain
    Propagation {
        /// File with one domain per line
        file: PathBuf,

        /// Record type
        #[arg(short = 't', long = "type", default_value = "A")]
        record_type: DnsRecordType,

        /// "default", "all", or a comma list of providers and addresses
        #[arg(short = 'n', long, default_value = "default")]
        nameservers: String,

        /// Domains processed at once
        #[arg(short, long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Run the consistency checks on every domain
    Consistency {
        /// File with one domain per line
        file: PathBuf,

        /// "default", "all", or a comma list of providers and addresses
        #[arg(short = 'n', long, default_value = "default")]
        nameservers: String,

        /// Domains processed at once
        #[arg(short, long, value_name = "N")]
        concurrency: Option<usize>,
    },
}

impl BulkAction {
    fn file(&self) -> &PathBuf {
        match self {
            Self::Query { file, .. }
            | Self::Propagation { file, .. }
            | Self::Consistency { file, .. } => file,
        }
    }

    /// The operation and worker count, falling back to the settings.
    fn plan(&self, settings: &AppSettings) -> CliResult<(BulkOperation, usize)> {
        let plan = match self {
            Self::Query {
                record_type,
                nameserver,
                concurrency,
                ..
            } => (
                BulkOperation::Query {
                    record_type: *record_type,
                    nameserver: nameserver.clone(),
                },
                concurrency.unwrap_or(settings.bulk_query_concurrency),
            ),
            Self::Propagation {
                record_type,
                nameservers: selection,
                concurrency,
                ..
            } => (
                BulkOperation::Propagation {
                    record_type: *record_type,
                    nameservers: nameservers::select(selection)?,
                },
                concurrency.unwrap_or(settings.bulk_propagation_concurrency),
            ),
            Self::Consistency {
                nameservers: selection,
                concurrency,
                ..
            } => (
                BulkOperation::Consistency {
                    nameservers: nameservers::select(selection)?,
                },
                concurrency.unwrap_or(settings.bulk_consistency_concurrency),
            ),
        };
        Ok(plan)
    }
}

impl BulkCommand {
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let domains = read_domains_file(self.action.file())?;
        let (operation, concurrency) = self.action.plan(&ctx.settings)?;
        if ctx.interactive() {
            output::print_start_header(
                &format!("Bulk {}", operation.name()),
                &self.action.file().display().to_string(),
                &format!("{} domains, {} at a time", domains.len(), concurrency),
            );
        }

        let (bar, progress) = bulk_bar(domains.len(), ctx.interactive());
        let processor = BulkProcessor::new(resolver(ctx), concurrency).with_progress(progress);
        let summary = processor.process(&domains, &operation, &ctx.cancel).await;
        bar.finish_and_clear();

        output::format_results(&summary, ctx.format)?;
        if !summary.complete && !ctx.quiet {
            output::print_warning(&format!(
                "stopped early: {} of {} domains processed",
                summary.results.len(),
                summary.total_domains
            ));
        }
        Ok(())
    }
}
