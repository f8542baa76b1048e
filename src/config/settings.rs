//! Application settings and paths.
//!
//! Settings live in `settings.json` under the XDG config directory. Every
//! field is optional in the file; missing fields take the built-in default.
//! Command-line flags override whatever is loaded here.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::monitor::DEFAULT_INTERVAL;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory paths following the XDG Base Directory layout.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/netsweep)
    pub config_dir: PathBuf,
}

impl Paths {
    pub fn new() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("com", "netsweep", "netsweep").ok_or(ConfigError::DirectoryNotFound)?;
        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Simultaneous host probes.
    pub host_concurrency: usize,
    /// Simultaneous port probes.
    pub port_concurrency: usize,
    pub host_batch_size: usize,
    pub port_batch_size: usize,
    /// Workers for the `pool` discovery strategy.
    pub pool_workers: usize,
    pub pool_queue_depth: usize,

    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub liveness_deadline: Duration,
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub banner_timeout: Duration,
    pub grab_banners: bool,
    /// Probes per second, 0 for unlimited.
    pub rate_limit: u32,

    #[serde(with = "humantime_serde")]
    pub monitor_interval: Duration,

    pub bulk_query_concurrency: usize,
    pub bulk_propagation_concurrency: usize,
    pub bulk_consistency_concurrency: usize,

    #[serde(with = "humantime_serde")]
    pub dns_timeout: Duration,
    pub dns_attempts: usize,

    /// Connect plus handshake limit for certificate checks.
    #[serde(with = "humantime_serde")]
    pub tls_timeout: Duration,

    /// `plain`, `json` or `csv`.
    pub output_format: String,
    /// Overall time limit for a command; unset means none.
    #[serde(with = "humantime_serde")]
    pub deadline: Option<Duration>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host_concurrency: 500,
            port_concurrency: 5000,
            host_batch_size: 254,
            port_batch_size: 1000,
            pool_workers: 50,
            pool_queue_depth: 100,
            connect_timeout: Duration::from_secs(1),
            liveness_deadline: Duration::from_millis(200),
            attempt_timeout: Duration::from_millis(100),
            banner_timeout: Duration::from_millis(500),
            grab_banners: true,
            rate_limit: 0,
            monitor_interval: DEFAULT_INTERVAL,
            bulk_query_concurrency: 5,
            bulk_propagation_concurrency: 3,
            bulk_consistency_concurrency: 2,
            dns_timeout: Duration::from_secs(5),
            dns_attempts: 3,
            tls_timeout: Duration::from_secs(10),
            output_format: "plain".to_string(),
            deadline: None,
        }
    }
}

impl AppSettings {
    /// Load from `path` if given, otherwise from the default location.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let file = Paths::new()?.settings_file();
                if file.exists() {
                    Self::load_from(&file)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let counts = [
            ("host_concurrency", self.host_concurrency),
            ("port_concurrency", self.port_concurrency),
            ("host_batch_size", self.host_batch_size),
            ("port_batch_size", self.port_batch_size),
            ("pool_workers", self.pool_workers),
            ("pool_queue_depth", self.pool_queue_depth),
            ("bulk_query_concurrency", self.bulk_query_concurrency),
            ("bulk_propagation_concurrency", self.bulk_propagation_concurrency),
            ("bulk_consistency_concurrency", self.bulk_consistency_concurrency),
            ("dns_attempts", self.dns_attempts),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::InvalidFormat(format!("{} must be at least 1", name)));
        }
        if self.monitor_interval.is_zero() {
            return Err(ConfigError::InvalidFormat(
                "monitor_interval must be greater than zero".to_string(),
            ));
        }
        if self.tls_timeout.is_zero() {
            return Err(ConfigError::InvalidFormat(
                "tls_timeout must be greater than zero".to_string(),
            ));
        }
        if !matches!(self.output_format.as_str(), "plain" | "json" | "csv") {
            return Err(ConfigError::InvalidFormat(format!(
                "unknown output_format {:?}",
                self.output_format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.host_concurrency, 500);
        assert_eq!(settings.port_concurrency, 5000);
        assert_eq!(settings.connect_timeout, Duration::from_secs(1));
        assert_eq!(settings.monitor_interval, Duration::from_secs(30));
        assert_eq!(settings.tls_timeout, Duration::from_secs(10));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "host_concurrency": 64, "connect_timeout": "750ms" }"#).unwrap();

        let settings = AppSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.host_concurrency, 64);
        assert_eq!(settings.connect_timeout, Duration::from_millis(750));
        assert_eq!(settings.port_concurrency, 5000);
        assert_eq!(settings.deadline, None);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = AppSettings {
            deadline: Some(Duration::from_secs(90)),
            output_format: "json".to_string(),
            ..AppSettings::default()
        };
        settings.save_to(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"1m 30s\""));
        assert_eq!(AppSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempdir().unwrap();
        let err = AppSettings::load(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "port_concurrency": 0 }"#).unwrap();
        assert!(matches!(
            AppSettings::load_from(&path),
            Err(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_format() {
        let settings = AppSettings {
            output_format: "xml".to_string(),
            ..AppSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
