use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFailed(std::io::Error),
    #[error("failed to write config file: {0}")]
    WriteFailed(std::io::Error),
    #[error("failed to parse config file: {0}")]
    ParseFailed(String),
    #[error("no usable config directory ($XDG_CONFIG_HOME or $HOME unset)")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub probe: Probe,
    pub scheduler: Scheduler,
    pub database: Database,
}

/// Per-probe fetch behavior. Each probe runs `attempts` sequential fetches,
/// each bounded by `timeout_seconds`, pausing `delay_seconds` after every
/// attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    pub attempts: u32,
    pub timeout_seconds: u64,
    pub delay_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduler {
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub path: String,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/webpulse/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("webpulse/config.toml"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe: Probe { attempts: 3, timeout_seconds: 10, delay_seconds: 1 },
            scheduler: Scheduler { interval_seconds: 300 },
            database: Database { path: "webpulse.db".into() },
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current Internal Configuration State:")?;
        writeln!(f, "  Probe")?;
        writeln!(f, "    Attempts: {}", self.probe.attempts)?;
        writeln!(f, "    Timeout (s): {}", self.probe.timeout_seconds)?;
        writeln!(f, "    Delay (s): {}", self.probe.delay_seconds)?;
        writeln!(f, "  Scheduler")?;
        writeln!(f, "    Interval (s): {}", self.scheduler.interval_seconds)?;
        writeln!(f, "  Database")?;
        writeln!(f, "    Path: {}", self.database.path)?;
        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/webpulse/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(ConfigError::ReadFailed)?;
            toml::from_str(raw_string.as_str())
                .map_err(|err| ConfigError::ParseFailed(err.to_string()))
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)
            .map_err(|err| ConfigError::ParseFailed(err.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        fs::write(path, config_str).map_err(ConfigError::WriteFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.probe.attempts, 3);
        assert_eq!(config.scheduler.interval_seconds, 300);
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.probe.attempts = 5;
        config.write_config(&path).unwrap();

        let loaded = Config::from_config(Some(&path)).unwrap();
        assert_eq!(loaded.probe.attempts, 5);
        assert_eq!(loaded.database.path, "webpulse.db");
    }

    #[test]
    fn test_missing_file_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.toml");

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config.probe.attempts, 3);
        assert!(path.exists());
    }
}
