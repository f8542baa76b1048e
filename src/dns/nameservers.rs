//! Well-known public nameservers.
//!
//! Used to pick the servers for propagation and consistency checks when the
//! user names providers instead of addresses.

use crate::error::DnsError;
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr};

/// A public resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Nameserver {
    pub name: &'static str,
    pub ip: IpAddr,
    pub port: u16,
    pub provider: &'static str,
}

impl Nameserver {
    const fn v4(name: &'static str, octets: [u8; 4], provider: &'static str) -> Self {
        Self {
            name,
            ip: IpAddr::V4(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3])),
            port: 53,
            provider,
        }
    }

    /// Address in the form the resolver accepts.
    pub fn address(&self) -> String {
        if self.port == 53 {
            self.ip.to_string()
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }
}

/// Providers keyed by the name used on the command line.
pub const PROVIDERS: &[(&str, [Nameserver; 2])] = &[
    ("google", [
        Nameserver::v4("google-dns1", [8, 8, 8, 8], "Google"),
        Nameserver::v4("google-dns2", [8, 8, 4, 4], "Google"),
    ]),
    ("cloudflare", [
        Nameserver::v4("cloudflare-dns1", [1, 1, 1, 1], "Cloudflare"),
        Nameserver::v4("cloudflare-dns2", [1, 0, 0, 1], "Cloudflare"),
    ]),
    ("quad9", [
        Nameserver::v4("quad9-dns1", [9, 9, 9, 9], "Quad9"),
        Nameserver::v4("quad9-dns2", [149, 112, 112, 112], "Quad9"),
    ]),
    ("opendns", [
        Nameserver::v4("opendns1", [208, 67, 222, 222], "OpenDNS"),
        Nameserver::v4("opendns2", [208, 67, 220, 220], "OpenDNS"),
    ]),
    ("godaddy", [
        Nameserver::v4("godaddy-dns1", [173, 201, 71, 1], "GoDaddy"),
        Nameserver::v4("godaddy-dns2", [173, 201, 71, 12], "GoDaddy"),
    ]),
    ("squarespace", [
        Nameserver::v4("squarespace-dns1", [198, 185, 159, 144], "Squarespace"),
        Nameserver::v4("squarespace-dns2", [198, 185, 159, 145], "Squarespace"),
    ]),
    ("namecheap", [
        Nameserver::v4("namecheap-dns1", [198, 54, 120, 19], "Namecheap"),
        Nameserver::v4("namecheap-dns2", [198, 54, 117, 10], "Namecheap"),
    ]),
    ("dyn", [
        Nameserver::v4("dyn-dns1", [216, 146, 35, 35], "Dyn"),
        Nameserver::v4("dyn-dns2", [216, 146, 36, 36], "Dyn"),
    ]),
    ("comodo", [
        Nameserver::v4("comodo-dns1", [8, 26, 56, 26], "Comodo"),
        Nameserver::v4("comodo-dns2", [8, 20, 247, 20], "Comodo"),
    ]),
    ("verisign", [
        Nameserver::v4("verisign-dns1", [64, 6, 64, 6], "Verisign"),
        Nameserver::v4("verisign-dns2", [64, 6, 65, 6], "Verisign"),
    ]),
    ("adguard", [
        Nameserver::v4("adguard-dns1", [94, 140, 14, 14], "AdGuard"),
        Nameserver::v4("adguard-dns2", [94, 140, 15, 15], "AdGuard"),
    ]),
    ("cleanbrowsing", [
        Nameserver::v4("cleanbrowsing-dns1", [185, 228, 168, 9], "CleanBrowsing"),
        Nameserver::v4("cleanbrowsing-dns2", [185, 228, 169, 9], "CleanBrowsing"),
    ]),
    ("alternate", [
        Nameserver::v4("alternate-dns1", [76, 76, 19, 19], "Alternate DNS"),
        Nameserver::v4("alternate-dns2", [76, 223, 100, 101], "Alternate DNS"),
    ]),
    ("level3", [
        Nameserver::v4("level3-dns1", [209, 244, 0, 3], "Level3"),
        Nameserver::v4("level3-dns2", [209, 244, 0, 4], "Level3"),
    ]),
];

/// Servers of one provider.
pub fn provider(key: &str) -> Option<&'static [Nameserver]> {
    PROVIDERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, servers)| servers.as_slice())
}

/// Every known server.
pub fn all() -> impl Iterator<Item = &'static Nameserver> {
    PROVIDERS.iter().flat_map(|(_, servers)| servers.iter())
}

/// Primary servers of Google, Cloudflare and Quad9.
pub fn defaults() -> Vec<Nameserver> {
    ["google", "cloudflare", "quad9"]
        .iter()
        .filter_map(|key| provider(key).and_then(|servers| servers.first().copied()))
        .collect()
}

/// Turn a user selection into resolver addresses.
///
/// Accepts `all`, `default`, or a comma list mixing provider names and
/// literal addresses (`google,9.9.9.9,10.0.0.53:5353`). Duplicates are
/// dropped.
pub fn select(selection: &str) -> Result<Vec<String>, DnsError> {
    let selection = selection.trim();
    let mut addresses: Vec<String> = Vec::new();
    let mut push = |address: String| {
        if !addresses.contains(&address) {
            addresses.push(address);
        }
    };

    match selection.to_ascii_lowercase().as_str() {
        "" => return Err(DnsError::NoNameservers),
        "all" => all().for_each(|ns| push(ns.address())),
        "default" => defaults().iter().for_each(|ns| push(ns.address())),
        _ => {
            for token in selection.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                if let Some(servers) = provider(token) {
                    servers.iter().for_each(|ns| push(ns.address()));
                } else if is_address(token) {
                    push(token.to_string());
                } else {
                    return Err(DnsError::InvalidNameserver(token.to_string()));
                }
            }
        }
    }

    if addresses.is_empty() {
        return Err(DnsError::NoNameservers);
    }
    Ok(addresses)
}

fn is_address(token: &str) -> bool {
    token.parse::<IpAddr>().is_ok() || token.parse::<std::net::SocketAddr>().is_ok()
}
