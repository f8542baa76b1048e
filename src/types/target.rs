//! Target address types.
//!
//! [`AddressRange`] expands a network specification into the ordered list of
//! addresses to probe:
//! - `/24` shorthand (`192.168.1.0/24`): the 254 usable hosts `.1` through `.254`
//! - any other CIDR (`10.0.0.0/28`): network through broadcast address, inclusive
//! - a bare address (`10.0.0.7`): just that address
//!
//! [`resolve_host`] turns a single host argument (IP or hostname) into an address.

use ipnetwork::IpNetwork;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Error type for target parsing and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid network format: {0}")]
    InvalidFormat(String),
    #[error("range too large: {0} addresses (max: {1})")]
    TooLarge(u128, u128),
    #[error("failed to resolve hostname '{0}': {1}")]
    DnsResolutionFailed(String, String),
    #[error("no IP addresses found for hostname '{0}'")]
    NoAddressesFound(String),
}

/// A parsed network range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressRange {
    /// `a.b.c.x/24`: hosts `.1`..=`.254` of the /24.
    Class24([u8; 3]),
    /// Any other CIDR (or a bare address as a single-host network).
    Network(IpNetwork),
}

impl AddressRange {
    /// Maximum number of addresses a range may expand to (a /16).
    pub const MAX_ADDRESSES: u128 = 65536;

    /// Parse a network specification.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();

        if let Some(base) = s.strip_suffix("/24") {
            let base: Ipv4Addr = base
                .parse()
                .map_err(|_| TargetError::InvalidFormat(s.to_string()))?;
            let [a, b, c, _] = base.octets();
            return Ok(Self::Class24([a, b, c]));
        }

        let network: IpNetwork = s
            .parse()
            .map_err(|_| TargetError::InvalidFormat(s.to_string()))?;

        let count = network_size(&network);
        if count > Self::MAX_ADDRESSES {
            return Err(TargetError::TooLarge(count, Self::MAX_ADDRESSES));
        }

        Ok(Self::Network(network))
    }

    /// Number of addresses [`addresses`](Self::addresses) yields.
    pub fn len(&self) -> usize {
        match self {
            Self::Class24(_) => 254,
            Self::Network(network) => network_size(network) as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand into addresses in ascending numeric order.
    pub fn addresses(&self) -> Vec<IpAddr> {
        match self {
            Self::Class24([a, b, c]) => (1..=254u8)
                .map(|d| IpAddr::V4(Ipv4Addr::new(*a, *b, *c, d)))
                .collect(),
            // Walk from the masked network address so "10.0.0.5/30" starts at .4.
            Self::Network(IpNetwork::V4(net)) => {
                let first = u32::from(net.network());
                let last = u32::from(net.broadcast());
                (first..=last).map(|n| IpAddr::V4(Ipv4Addr::from(n))).collect()
            }
            Self::Network(network @ IpNetwork::V6(_)) => network.iter().collect(),
        }
    }
}

impl FromStr for AddressRange {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class24([a, b, c]) => write!(f, "{}.{}.{}.0/24", a, b, c),
            Self::Network(network) => write!(f, "{}", network),
        }
    }
}

fn network_size(network: &IpNetwork) -> u128 {
    match network {
        IpNetwork::V4(net) => 1u128 << (32 - net.prefix() as u32),
        IpNetwork::V6(net) => {
            let prefix = net.prefix() as u32;
            if prefix == 0 {
                u128::MAX
            } else {
                1u128 << (128 - prefix)
            }
        }
    }
}

/// Resolve a hostname or IP address string to an `IpAddr`.
pub async fn resolve_host(target: &str) -> Result<IpAddr, TargetError> {
    let target = target.trim();
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }

    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

    let response = resolver
        .lookup_ip(target)
        .await
        .map_err(|e| TargetError::DnsResolutionFailed(target.to_string(), e.to_string()))?;

    response
        .iter()
        .next()
        .ok_or_else(|| TargetError::NoAddressesFound(target.to_string()))
}
