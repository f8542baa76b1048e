//! Service identification based on well-known port numbers.
//!
//! The table is built once on first use and is read-only afterwards.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Static map of well-known ports to service names.
static PORT_SERVICES: LazyLock<HashMap<u16, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        (21, "FTP"),
        (22, "SSH"),
        (23, "Telnet"),
        (25, "SMTP"),
        (53, "DNS"),
        (80, "HTTP"),
        (110, "POP3"),
        (135, "RPC"),
        (139, "NetBIOS"),
        (143, "IMAP"),
        (443, "HTTPS"),
        (445, "SMB"),
        (993, "IMAPS"),
        (995, "POP3S"),
        (1433, "MSSQL"),
        (1521, "Oracle"),
        (3306, "MySQL"),
        (3389, "RDP"),
        (5432, "PostgreSQL"),
        (5900, "VNC"),
        (6379, "Redis"),
        (8080, "HTTP-Alt"),
        (9200, "Elasticsearch"),
        (27017, "MongoDB"),
    ])
});

/// Look up the probable service name for a given port.
///
/// Returns `None` if the port is not in the table.
pub fn service_name(port: u16) -> Option<&'static str> {
    PORT_SERVICES.get(&port).copied()
}
