//! Output formatting module.
//!
//! Provides formatters for plain text, JSON, and CSV output of results.
//! Results go to stdout; messages and progress go to stderr.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::{print_csv, write_csv, Tabular};
pub use json_format::{print_json, print_json_line};
pub use plain::{
    print_error, print_info, print_plain, print_start_header, print_success, print_warning,
    Plain,
};

use crate::cli::OutputFormat;
use serde::Serialize;
use std::io;

/// Format and print a result according to the specified format.
pub fn format_results<T>(value: &T, format: OutputFormat) -> io::Result<()>
where
    T: Serialize + Plain + Tabular,
{
    match format {
        OutputFormat::Plain => print_plain(value),
        OutputFormat::Json => print_json(value),
        OutputFormat::Csv => print_csv(value, true),
    }
}

/// Print one element of a stream. JSON becomes one line per element and
/// the CSV header is written only for the first.
pub fn format_stream_item<T>(value: &T, format: OutputFormat, first: bool) -> io::Result<()>
where
    T: Serialize + Plain + Tabular,
{
    match format {
        OutputFormat::Plain => print_plain(value),
        OutputFormat::Json => print_json_line(value),
        OutputFormat::Csv => print_csv(value, first),
    }
}
