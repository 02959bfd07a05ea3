//! Weft configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. File named by --config
//! 3. Project-level (./weft.toml)
//! 4. User-level (~/.config/weft/config.toml)
//! 5. Default values
//! ```
//!
//! Only the first file found is read; files are not merged.
//!
//! # Usage
//!
//! ```rust
//! use weft::util::config::WeftConfig;
//!
//! let config = WeftConfig::parse("[log]\nlevel = \"debug\"").unwrap();
//! assert_eq!(config.render.encoding, "utf-8");
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::logger::LogLevel;

/// Project-level config file name
pub const PROJECT_CONFIG: &str = "weft.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WeftConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// How `<%= %>` output is escaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    #[default]
    Html,
    None,
}

/// `[render]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Directory for compiled programs
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default)]
    pub escape: EscapeMode,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            encoding: default_encoding(),
            escape: EscapeMode::Html,
        }
    }
}

/// `[log]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
}

impl WeftConfig {
    /// Load `explicit` if given, else the first config file found, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let project = PathBuf::from(PROJECT_CONFIG);
        if project.exists() {
            return Self::from_file(&project);
        }
        match get_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory on Unix
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("weft"));
    }

    // Fallback to ~/.config/weft
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("weft"));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("weft"));
    }

    None
}

/// Get the user config file path (~/.config/weft/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WeftConfig::parse("").unwrap();
        assert_eq!(config, WeftConfig::default());
        assert_eq!(config.render.escape, EscapeMode::Html);
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_sections() {
        let config = WeftConfig::parse(
            r#"
            [render]
            cache_dir = "/tmp/weft"
            encoding = "latin-1"
            escape = "none"

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.render.cache_dir, Some(PathBuf::from("/tmp/weft")));
        assert_eq!(config.render.encoding, "latin-1");
        assert_eq!(config.render.escape, EscapeMode::None);
        assert_eq!(config.log.level, LogLevel::Debug);
    }

    #[test]
    fn test_bad_config() {
        assert!(matches!(WeftConfig::parse("[render]\nescape = 3"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weft.toml");
        let mut config = WeftConfig::default();
        config.log.level = LogLevel::Warn;
        fs::write(&path, config.to_toml().unwrap()).unwrap();
        assert_eq!(WeftConfig::load(Some(&path)).unwrap(), config);
        assert!(WeftConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
