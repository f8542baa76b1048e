//! DNSSEC record inspection.
//!
//! DS, DNSKEY and RRSIG answers arrive as raw RDATA and are decoded here.
//! The chain check is structural: it confirms that the parent publishes a
//! DS matching one of the zone's keys, that a zone key exists and that every
//! signature is inside its validity window. Signatures are not verified
//! cryptographically.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use trust_dns_resolver::proto::rr::RecordType;

/// Zone Key bit of the DNSKEY flags field.
const ZONE_KEY: u16 = 0x0100;
/// Secure Entry Point bit, set on key-signing keys.
const SECURE_ENTRY_POINT: u16 = 0x0001;

/// DNSSEC record types fetched during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnssecRecordType {
    Ds,
    Dnskey,
    Rrsig,
}

impl DnssecRecordType {
    pub(crate) fn to_record_type(self) -> RecordType {
        match self {
            Self::Ds => RecordType::DS,
            Self::Dnskey => RecordType::DNSKEY,
            Self::Rrsig => RecordType::RRSIG,
        }
    }
}

impl fmt::Display for DnssecRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Ds => "DS",
            Self::Dnskey => "DNSKEY",
            Self::Rrsig => "RRSIG",
        })
    }
}

/// Delegation Signer record published by the parent zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DsRecord {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    /// Lowercase hex.
    pub digest: String,
}

impl DsRecord {
    pub fn from_rdata(rdata: &[u8]) -> Option<Self> {
        if rdata.len() < 5 {
            return None;
        }
        Some(Self {
            key_tag: u16::from_be_bytes([rdata[0], rdata[1]]),
            algorithm: rdata[2],
            digest_type: rdata[3],
            digest: hex(&rdata[4..]),
        })
    }

    pub fn digest_name(&self) -> &'static str {
        match self.digest_type {
            1 => "SHA-1",
            2 => "SHA-256",
            3 => "GOST R 34.11-94",
            4 => "SHA-384",
            _ => "unknown",
        }
    }
}

/// What a DNSKEY is used for, from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    /// Key-signing key.
    Ksk,
    /// Zone-signing key.
    Zsk,
    /// Not a zone key.
    Other,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Ksk => "KSK",
            Self::Zsk => "ZSK",
            Self::Other => "other",
        })
    }
}

/// Public key published by the zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnskeyRecord {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub key_tag: u16,
    /// Length of the public key material in bytes.
    pub key_length: usize,
}

impl DnskeyRecord {
    pub fn from_rdata(rdata: &[u8]) -> Option<Self> {
        if rdata.len() < 4 {
            return None;
        }
        Some(Self {
            flags: u16::from_be_bytes([rdata[0], rdata[1]]),
            protocol: rdata[2],
            algorithm: rdata[3],
            key_tag: key_tag(rdata),
            key_length: rdata.len() - 4,
        })
    }

    pub fn role(&self) -> KeyRole {
        match (self.flags & ZONE_KEY != 0, self.flags & SECURE_ENTRY_POINT != 0) {
            (true, true) => KeyRole::Ksk,
            (true, false) => KeyRole::Zsk,
            (false, _) => KeyRole::Other,
        }
    }

    pub fn is_zone_key(&self) -> bool {
        self.flags & ZONE_KEY != 0
    }
}

/// Signature over one RRset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RrsigRecord {
    pub type_covered: String,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: DateTime<Utc>,
    pub inception: DateTime<Utc>,
    pub key_tag: u16,
    pub signer_name: String,
}

impl RrsigRecord {
    pub fn from_rdata(rdata: &[u8]) -> Option<Self> {
        if rdata.len() < 18 {
            return None;
        }
        let type_covered = RecordType::from(u16::from_be_bytes([rdata[0], rdata[1]]));
        let seconds = |at: usize| {
            let raw = u32::from_be_bytes([rdata[at], rdata[at + 1], rdata[at + 2], rdata[at + 3]]);
            DateTime::from_timestamp(i64::from(raw), 0)
        };
        let (signer_name, _signature) = read_name(&rdata[18..])?;

        Some(Self {
            type_covered: type_covered.to_string(),
            algorithm: rdata[2],
            labels: rdata[3],
            original_ttl: u32::from_be_bytes([rdata[4], rdata[5], rdata[6], rdata[7]]),
            expiration: seconds(8)?,
            inception: seconds(12)?,
            key_tag: u16::from_be_bytes([rdata[16], rdata[17]]),
            signer_name,
        })
    }

    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.inception <= now && now <= self.expiration
    }
}

/// Outcome of a DNSSEC check of one domain against one nameserver.
#[derive(Debug, Clone, Serialize)]
pub struct DnssecReport {
    pub domain: String,
    pub nameserver: String,
    /// The parent zone publishes a DS record.
    pub delegated: bool,
    /// The zone publishes DNSKEY records.
    pub signed: bool,
    /// The chain from DS to signatures holds together.
    pub valid: bool,
    pub errors: Vec<String>,
    pub ds: Vec<DsRecord>,
    pub dnskeys: Vec<DnskeyRecord>,
    pub rrsigs: Vec<RrsigRecord>,
    pub checked_at: DateTime<Utc>,
}

/// Raw answers for the three record types; `None` when not asked.
pub(crate) struct DnssecAnswers {
    pub ds: Option<Result<Vec<Vec<u8>>, String>>,
    pub dnskey: Result<Vec<Vec<u8>>, String>,
    pub rrsig: Result<Vec<Vec<u8>>, String>,
}

impl DnssecReport {
    pub(crate) fn assemble(
        domain: &str,
        nameserver: &str,
        answers: DnssecAnswers,
        now: DateTime<Utc>,
    ) -> Self {
        let mut errors = Vec::new();
        let ds = match answers.ds {
            Some(answer) => {
                decode(answer, DnssecRecordType::Ds, DsRecord::from_rdata, &mut errors)
            }
            None => Vec::new(),
        };
        let dnskeys = decode(
            answers.dnskey,
            DnssecRecordType::Dnskey,
            DnskeyRecord::from_rdata,
            &mut errors,
        );
        let rrsigs = decode(
            answers.rrsig,
            DnssecRecordType::Rrsig,
            RrsigRecord::from_rdata,
            &mut errors,
        );

        let mut report = Self {
            domain: domain.to_string(),
            nameserver: nameserver.to_string(),
            delegated: !ds.is_empty(),
            signed: !dnskeys.is_empty(),
            valid: false,
            errors,
            ds,
            dnskeys,
            rrsigs,
            checked_at: now,
        };

        if report.delegated && report.signed {
            match report.chain_problem(now) {
                Some(problem) => report.errors.push(problem),
                None => report.valid = true,
            }
        }
        report
    }

    /// First reason the chain of trust does not hold, if any.
    fn chain_problem(&self, now: DateTime<Utc>) -> Option<String> {
        if self.rrsigs.is_empty() {
            return Some("no RRSIG records found".to_string());
        }
        if !self.dnskeys.iter().any(DnskeyRecord::is_zone_key) {
            return Some("no zone key among the DNSKEY records".to_string());
        }
        let matched = self
            .ds
            .iter()
            .any(|ds| self.dnskeys.iter().any(|key| key.key_tag == ds.key_tag));
        if !matched {
            return Some("no DS record matches a published DNSKEY".to_string());
        }
        self.rrsigs.iter().find(|sig| !sig.is_current(now)).map(|sig| {
            format!(
                "RRSIG over {} (key tag {}) is outside {} .. {}",
                sig.type_covered, sig.key_tag, sig.inception, sig.expiration
            )
        })
    }
}

fn decode<T>(
    answer: Result<Vec<Vec<u8>>, String>,
    record_type: DnssecRecordType,
    parse: fn(&[u8]) -> Option<T>,
    errors: &mut Vec<String>,
) -> Vec<T> {
    match answer {
        Ok(rdatas) => rdatas
            .iter()
            .filter_map(|rdata| {
                let parsed = parse(rdata);
                if parsed.is_none() {
                    errors.push(format!("malformed {} record", record_type));
                }
                parsed
            })
            .collect(),
        Err(reason) => {
            errors.push(format!("{} query failed: {}", record_type, reason));
            Vec::new()
        }
    }
}

/// Whether `domain` has a parent zone that could hold its DS record.
pub(crate) fn has_parent(domain: &str) -> bool {
    domain.trim_end_matches('.').contains('.')
}

/// Key tag as defined for DNSKEY RDATA (RFC 4034, appendix B).
pub fn key_tag(rdata: &[u8]) -> u16 {
    let mut acc: u32 = 0;
    for (i, byte) in rdata.iter().enumerate() {
        acc += if i % 2 == 0 {
            u32::from(*byte) << 8
        } else {
            u32::from(*byte)
        };
    }
    acc += (acc >> 16) & 0xFFFF;
    (acc & 0xFFFF) as u16
}

/// Read an uncompressed wire-format name, returning it and the remaining bytes.
fn read_name(mut wire: &[u8]) -> Option<(String, &[u8])> {
    let mut labels = Vec::new();
    loop {
        let (&len, rest) = wire.split_first()?;
        let len = usize::from(len);
        if len == 0 {
            wire = rest;
            break;
        }
        if len > 63 || rest.len() < len {
            return None;
        }
        labels.push(String::from_utf8_lossy(&rest[..len]).into_owned());
        wire = &rest[len..];
    }
    let name = if labels.is_empty() {
        ".".to_string()
    } else {
        format!("{}.", labels.join("."))
    };
    Some((name, wire))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Mnemonic for a DNSSEC algorithm number.
pub fn algorithm_name(algorithm: u8) -> &'static str {
    match algorithm {
        5 => "RSASHA1",
        7 => "RSASHA1-NSEC3-SHA1",
        8 => "RSASHA256",
        10 => "RSASHA512",
        13 => "ECDSAP256SHA256",
        14 => "ECDSAP384SHA384",
        15 => "ED25519",
        16 => "ED448",
        _ => "unknown",
    }
}
