//! Configuration management for netsweep.
//!
//! Provides XDG-compliant settings storage. Built-in defaults, then the
//! settings file, then command-line flags, each overriding the previous.

mod settings;

pub use settings::{AppSettings, Paths};
