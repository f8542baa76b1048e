//! Error types for netsweep.
//!
//! Uses `thiserror` for ergonomic error definitions. Input errors are fatal and
//! surface before any network activity; per-probe failures never become errors
//! at this level (see [`crate::scanner::executor`]).

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{PortError, TargetError};

/// Errors raised while preparing or running a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid range: {0}")]
    InvalidRange(#[from] TargetError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors from a single DNS operation.
///
/// Inside a bulk run these are recorded on the domain's result rather than
/// propagated.
#[derive(Error, Debug, Clone)]
pub enum DnsError {
    #[error("invalid nameserver address: {0}")]
    InvalidNameserver(String),

    #[error("unsupported record type: {0}")]
    UnsupportedRecordType(String),

    #[error("DNS query for {domain} failed: {reason}")]
    QueryFailed { domain: String, reason: String },

    #[error("no nameserver answered for {0}")]
    NoAnswer(String),

    #[error("no nameservers given")]
    NoNameservers,

    #[error("operation cancelled")]
    Cancelled,
}

/// Result type alias for DNS operations.
pub type DnsResult<T> = Result<T, DnsError>;

/// Errors raised while loading a bulk domain list.
#[derive(Error, Debug)]
pub enum BulkError {
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid domain on line {line}: {domain}")]
    InvalidDomain { line: usize, domain: String },

    #[error("no valid domains found in {0}")]
    NoDomains(PathBuf),
}

/// Errors from a TLS certificate check.
#[derive(Error, Debug)]
pub enum SslError {
    #[error("invalid host name: {0}")]
    InvalidHost(String),

    #[error("cannot connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS handshake with {target} failed: {source}")]
    Handshake {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out talking to {0}")]
    Timeout(String),

    #[error("{0} presented no certificate")]
    NoCertificate(String),

    #[error("cannot parse certificate: {0}")]
    Parse(String),

    #[error("certificate check cancelled")]
    Cancelled,
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level error for command handlers.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Dns(#[from] DnsError),

    #[error(transparent)]
    Bulk(#[from] BulkError),

    #[error(transparent)]
    Ssl(#[from] SslError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for command handlers.
pub type CliResult<T> = Result<T, CliError>;
