//! SSL subcommand implementation.
//!
//! Handles `netsweep ssl <host>`, reporting the certificate a TLS service
//! presents.

use super::Context;
use crate::error::{CliResult, SslError};
use crate::output;
use crate::ssl::{CertificateChecker, CertificateInfo, DEFAULT_TLS_PORT};
use clap::Parser;
use std::time::Duration;

/// Inspect the certificate served by a TLS endpoint.
#[derive(Parser, Debug)]
pub struct SslCommand {
    /// Host name or IP address
    pub host: String,

    /// TLS port
    #[arg(short, long, default_value_t = DEFAULT_TLS_PORT)]
    pub port: u16,

    /// Connect and handshake limit (e.g. "5s")
    #[arg(short, long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

/// Problems worth a warning line after the report.
fn warnings(info: &CertificateInfo) -> Vec<String> {
    let certificate = &info.certificate;
    let mut found = Vec::new();
    if !certificate.valid_now {
        if certificate.days_remaining < 0 {
            found.push(format!("certificate expired {} days ago", -certificate.days_remaining));
        } else {
            found.push("certificate is not yet valid".to_string());
        }
    } else if certificate.expires_soon() {
        found.push(format!("certificate expires in {} days", certificate.days_remaining));
    }
    if !info.host_matches {
        found.push(format!("certificate does not cover {}", info.host));
    }
    if let Some(reason) = &info.trust_error {
        found.push(format!("certificate is not trusted: {}", reason));
    }
    found
}

impl SslCommand {
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let checker = CertificateChecker::new(self.timeout.unwrap_or(ctx.settings.tls_timeout));
        let info = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(SslError::Cancelled),
            result = checker.check(&self.host, self.port) => result,
        }?;

        output::format_results(&info, ctx.format)?;
        if !ctx.quiet {
            for warning in warnings(&info) {
                output::print_warning(&warning);
            }
        }
        Ok(())
    }
}
