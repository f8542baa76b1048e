//! Config subcommand implementation.
//!
//! Handles `netsweep config` for locating, showing and creating the
//! settings file.

use super::OutputFormat;
use crate::config::{AppSettings, Paths};
use crate::error::{CliError, CliResult};
use crate::output;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Inspect or create the settings file.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print where settings are read from
    Path,

    /// Print the effective settings
    Show,

    /// Write a settings file containing the defaults
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn settings_path(explicit: Option<&Path>) -> CliResult<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Paths::new()?.settings_file()),
    }
}

impl ConfigCommand {
    /// Execute the config command. Runs before settings are loaded so that
    /// `init` works even when the current file is broken.
    pub fn execute(&self, explicit: Option<&Path>, format: Option<OutputFormat>) -> CliResult<()> {
        let path = settings_path(explicit)?;
        match &self.action {
            ConfigAction::Path => {
                println!("{}", path.display());
            }
            ConfigAction::Show => {
                let settings = AppSettings::load(explicit)?;
                match format.unwrap_or(OutputFormat::Json) {
                    OutputFormat::Json | OutputFormat::Plain => output::print_json(&settings)?,
                    OutputFormat::Csv => {
                        return Err(CliError::Other(
                            "settings cannot be shown as CSV".to_string(),
                        ))
                    }
                }
            }
            ConfigAction::Init { force } => {
                init_settings(&path, *force)?;
                output::print_success(&format!("Wrote default settings to {}", path.display()));
            }
        }
        Ok(())
    }
}

fn init_settings(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() && !force {
        return Err(CliError::Other(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    AppSettings::default().save_to(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        init_settings(&path, false).unwrap();
        assert_eq!(AppSettings::load_from(&path).unwrap(), AppSettings::default());
        assert!(init_settings(&path, false).is_err());
        assert!(init_settings(&path, true).is_ok());
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = Path::new("/tmp/netsweep-test/settings.json");
        assert_eq!(settings_path(Some(path)).unwrap(), path);
    }
}
