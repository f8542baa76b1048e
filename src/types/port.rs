//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortSpec` parses user specifications such as `"22,80,8000-8100"`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value.into()))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u64),
    #[error("invalid port number: {0:?}")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
}

/// A range of ports (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Create a new port range.
    pub fn new(start: Port, end: Port) -> Result<Self, PortError> {
        if start > end {
            Err(PortError::InvalidRange(start.0, end.0))
        } else {
            Ok(Self { start, end })
        }
    }

    /// Create a range containing a single port.
    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Number of ports in this range.
    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    /// A valid range always holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over all ports in this range, ascending.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A port specification made of comma-separated tokens.
///
/// Each token is a single port (`"80"`) or an inclusive range (`"1-1000"`),
/// so `"22,80,443,8000-8100"` is accepted. Expansion keeps the order the
/// tokens were written in and drops repeated ports after their first
/// occurrence.
#[derive(Debug, Clone, Default)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    /// Expand into the ordered port list.
    pub fn to_ports(&self) -> Vec<Port> {
        let mut seen = HashSet::new();
        self.ranges
            .iter()
            .flat_map(PortRange::iter)
            .filter(|port| seen.insert(*port))
            .collect()
    }

    /// Number of ports the specification expands to.
    pub fn count(&self) -> usize {
        self.to_ports().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn parse_port(token: &str) -> Result<Port, PortError> {
    let token = token.trim();
    let value: u64 = token
        .parse()
        .map_err(|_| PortError::InvalidFormat(token.to_string()))?;
    u16::try_from(value)
        .ok()
        .and_then(Port::new)
        .ok_or(PortError::OutOfRange(value))
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        let mut ranges = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            match part.split_once('-') {
                Some((start, end)) => {
                    let range = PortRange::new(parse_port(start)?, parse_port(end)?)?;
                    ranges.push(range);
                }
                None => ranges.push(PortRange::single(parse_port(part)?)),
            }
        }

        Ok(Self { ranges })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Parse a port specification straight into the ordered port list.
pub fn parse_ports(spec: &str) -> Result<Vec<Port>, PortError> {
    Ok(spec.parse::<PortSpec>()?.to_ports())
}
