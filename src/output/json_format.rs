//! JSON output formatting.

use serde::Serialize;
use std::io;

fn to_io(e: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(to_io)?;
    println!("{}", json);
    Ok(())
}

/// Print a value as one compact JSON line, for streams such as monitor ticks.
pub fn print_json_line<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string(value).map_err(to_io)?;
    println!("{}", json);
    Ok(())
}
