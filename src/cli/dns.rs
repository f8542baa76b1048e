//! DNS subcommand implementation.
//!
//! Handles `netsweep dns` for checks against a single domain.

use super::Context;
use crate::dns::{nameservers, DnsOperations, DnsRecordType, Nameserver, QueryOptions, Resolver};
use crate::error::{CliResult, DnsError, DnsResult};
use crate::output;
use clap::{Parser, Subcommand};
use std::future::Future;

/// DNS checks for one domain.
#[derive(Parser, Debug)]
pub struct DnsCommand {
    #[command(subcommand)]
    pub action: DnsAction,
}

/// DNS actions.
#[derive(Subcommand, Debug)]
pub enum DnsAction {
    /// Ask one nameserver for one record type
    Query {
        /// Domain to query
        domain: String,

        /// Record type (A, AAAA, CNAME, MX, NS, TXT, SOA, PTR, SRV)
        #[arg(short = 't', long = "type", default_value = "A")]
        record_type: DnsRecordType,

        /// Nameserver address, "ip" or "ip:port"
        #[arg(short = 'n', long, default_value = "8.8.8.8")]
        nameserver: String,
    },

    /// Compare the answers of several nameservers
    Propagation {
        /// Domain to check
        domain: String,

        /// Record type
        #[arg(short = 't', long = "type", default_value = "A")]
        record_type: DnsRecordType,

        /// "default", "all", or a comma list of providers and addresses
        #[arg(short = 'n', long, default_value = "default")]
        nameservers: String,
    },

    /// Look for misconfigurations across the common record types
    Consistency {
        /// Domain to check
        domain: String,

        /// "default", "all", or a comma list of providers and addresses
        #[arg(short = 'n', long, default_value = "default")]
        nameservers: String,
    },

    /// Check the DNSSEC chain of trust for a zone
    Dnssec {
        /// Domain to check
        domain: String,

        /// Nameserver address, "ip" or "ip:port"
        #[arg(short = 'n', long, default_value = "8.8.8.8")]
        nameserver: String,
    },

    /// List the known public nameservers
    Nameservers,
}

/// Resolver built from the loaded settings.
pub(super) fn resolver(ctx: &Context) -> Resolver {
    Resolver::new(QueryOptions {
        timeout: ctx.settings.dns_timeout,
        attempts: ctx.settings.dns_attempts,
    })
}

/// Run `operation` unless the command is cancelled first.
async fn cancellable<T>(
    ctx: &Context,
    operation: impl Future<Output = DnsResult<T>>,
) -> DnsResult<T> {
    tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Err(DnsError::Cancelled),
        result = operation => result,
    }
}

impl DnsCommand {
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let dns = resolver(ctx);
        match &self.action {
            DnsAction::Query {
                domain,
                record_type,
                nameserver,
            } => {
                let result =
                    cancellable(ctx, dns.query(domain, *record_type, nameserver)).await?;
                output::format_results(&result, ctx.format)?;
            }
            DnsAction::Propagation {
                domain,
                record_type,
                nameservers: selection,
            } => {
                let servers = nameservers::select(selection)?;
                let result =
                    cancellable(ctx, dns.check_propagation(domain, *record_type, &servers))
                        .await?;
                output::format_results(&result, ctx.format)?;
                if result.inconsistent && !ctx.quiet {
                    output::print_warning("nameservers disagree on the answer");
                }
            }
            DnsAction::Consistency {
                domain,
                nameservers: selection,
            } => {
                let servers = nameservers::select(selection)?;
                let report = cancellable(ctx, dns.check_consistency(domain, &servers)).await?;
                output::format_results(&report, ctx.format)?;
            }
            DnsAction::Dnssec { domain, nameserver } => {
                let report = cancellable(ctx, dns.verify_dnssec(domain, nameserver)).await?;
                output::format_results(&report, ctx.format)?;
                if !ctx.quiet {
                    if !report.signed {
                        output::print_warning("zone is not signed");
                    } else if !report.valid {
                        output::print_warning("DNSSEC chain of trust does not hold");
                    }
                }
            }
            DnsAction::Nameservers => {
                let known: Vec<Nameserver> = nameservers::all().copied().collect();
                output::format_results(&known, ctx.format)?;
            }
        }
        Ok(())
    }
}
