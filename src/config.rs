//! Server configuration.
//!
//! Read from `config.toml`, either the file given on the command line or
//! `<config dir>/playbook-lsp/config.toml`.  Every field is optional:
//!
//! ```toml
//! module_paths = ["/usr/share/ansible/plugins/modules", "./library"]
//! directives_file = "/etc/playbook-lsp/directives.toml"
//! max_heal_attempts = 64
//! completion_timeout_ms = 2000
//! log_level = "debug"
//!
//! [parameters]
//! my_module = ["src", "dest"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use etcetera::BaseStrategy;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Environment variable holding extra module search paths.
pub const LIBRARY_ENV: &str = "ANSIBLE_LIBRARY";

const APP_DIR: &str = "playbook-lsp";
const FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directories searched for modules, in priority order.
    pub module_paths: Vec<PathBuf>,
    /// Replacement for the built-in directive table.
    pub directives_file: Option<PathBuf>,
    /// Repairs attempted per request before giving up; `0` means no limit.
    pub max_heal_attempts: usize,
    pub completion_timeout_ms: u64,
    pub log_level: Option<String>,
    /// Parameter names per module, taking precedence over module
    /// documentation.
    pub parameters: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module_paths: Vec::new(),
            directives_file: None,
            max_heal_attempts: 64,
            completion_timeout_ms: 2000,
            log_level: None,
            parameters: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist.  Without one, the default location is
    /// tried and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text, path)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Configured module paths followed by those from `ANSIBLE_LIBRARY`.
    pub fn module_search_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.module_paths.clone();
        if let Some(library) = std::env::var_os(LIBRARY_ENV) {
            paths.extend(std::env::split_paths(&library).filter(|p| !p.as_os_str().is_empty()));
        }
        paths
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }
}

/// `<config dir>/playbook-lsp/config.toml`, if a home directory is known.
pub fn default_path() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join(APP_DIR).join(FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("", Path::new("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_heal_attempts, 64);
    }

    #[test]
    fn reads_all_fields() {
        let text = r#"
            module_paths = ["/opt/modules"]
            directives_file = "/etc/directives.toml"
            max_heal_attempts = 0
            completion_timeout_ms = 250
            log_level = "trace"

            [parameters]
            ping = ["data"]
        "#;
        let config = Config::from_toml(text, Path::new("config.toml")).unwrap();
        assert_eq!(config.module_paths, vec![PathBuf::from("/opt/modules")]);
        assert_eq!(config.max_heal_attempts, 0);
        assert_eq!(config.completion_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_level.as_deref(), Some("trace"));
        assert_eq!(config.parameters["ping"], vec!["data".to_string()]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_toml("modules = 1\n", Path::new("my.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("my.toml"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
