//! Core input types with newtype patterns for type safety.
//!
//! Parsing happens here, before any network activity, so malformed input is
//! rejected up front.

mod port;
mod target;

pub use port::{parse_ports, Port, PortError, PortRange, PortSpec};
pub use target::{resolve_host, AddressRange, TargetError};

/// Serialize a `Duration` as fractional milliseconds.
pub(crate) mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
    }
}
