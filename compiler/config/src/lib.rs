#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Portico Configuration
//!
//! This crate loads the optional `portico.toml` that supplies defaults for
//! the compiler:
//! - Discovery behaviour (`[scan]`)
//! - Code generation parameters (`[codegen]`)
//! - Logging configuration (`[logging]`)
//!
//! Every section and key is optional; missing values take the defaults
//! below. Command-line flags override whatever is loaded here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the per-project configuration file.
pub const PROJECT_CONFIG_FILE: &str = "portico.toml";

/// Default bound of the stream queues in generated clients.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Errors that can occur when loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file
    #[error("failed to access config file `{path}`: {source}")]
    Io {
        /// Configuration file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// Failed to parse the TOML configuration file
    #[error("failed to parse config file `{path}`: {source}")]
    Parse {
        /// Configuration file
        path: PathBuf,
        /// Parser error
        source: toml::de::Error,
    },
    /// Failed to serialize configuration to TOML format
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A value is out of range
    #[error("invalid config value `{key}`: {reason}")]
    Invalid {
        /// Dotted key, e.g. `codegen.channel_capacity`
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
    /// Could not locate the user's configuration directory
    #[error("could not find the user config directory")]
    ConfigDirUnavailable,
}

/// Convenient result type for configuration functions.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Entrypoint discovery settings
    pub scan: ScanConfig,
    /// Code generation settings
    pub codegen: CodegenConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Entrypoint discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Skip modules that fail to load instead of aborting
    pub tolerate_load_errors: bool,
}

/// Code generation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    /// Where to write generated modules; defaults to `generated/` next to the sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Path replacing the leading `crate` of domain types in generated code
    pub domain_crate: String,
    /// Bound of the stream queues in generated clients
    pub channel_capacity: usize,
    /// Run rustfmt over the written files
    pub rustfmt: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            domain_crate: "crate".to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            rustfmt: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level or filter directive (error, warn, info, debug, trace)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { level: "info".to_string() } }
}

impl Config {
    /// Load configuration from a TOML file at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Config = toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Save this configuration as a pretty-printed TOML file at `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
    }

    /// Returns the user config file path:
    /// `{config_dir()}/portico/config.toml`
    pub fn user_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or(ConfigError::ConfigDirUnavailable)?.join("portico");
        Ok(config_dir.join("config.toml"))
    }

    /// Load the effective configuration.
    ///
    /// An explicit path must exist. Otherwise `./portico.toml` is used when
    /// present, then the user config file, then the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit, std::env::current_dir().ok(), Self::user_path().ok()) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Internal lookup with injectable directories for testing.
    fn locate(
        explicit: Option<&Path>,
        current_dir: Option<PathBuf>,
        user_path: Option<PathBuf>,
    ) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        current_dir
            .map(|dir| dir.join(PROJECT_CONFIG_FILE))
            .filter(|path| path.is_file())
            .or_else(|| user_path.filter(|path| path.is_file()))
    }

    /// Reject values the compiler cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.codegen.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "codegen.channel_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.codegen.domain_crate.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "codegen.domain_crate",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, NamedTempFile};

    use super::*;

    #[test]
    fn test_from_file() {
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        let toml_content = r#"
            [scan]
            tolerate_load_errors = true

            [codegen]
            output_dir = "src/transport"
            domain_crate = "::shop"
            channel_capacity = 8
            rustfmt = true

            [logging]
            level = "debug"
        "#;
        fs::write(&temp_file, toml_content).expect("Failed to write TOML content");

        let config = Config::from_file(&temp_file).expect("Failed to load config");
        assert!(config.scan.tolerate_load_errors);
        assert_eq!(config.codegen.output_dir, Some(PathBuf::from("src/transport")));
        assert_eq!(config.codegen.domain_crate, "::shop");
        assert_eq!(config.codegen.channel_capacity, 8);
        assert!(config.codegen.rustfmt);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn missing_sections_take_defaults() {
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        fs::write(&temp_file, "[codegen]\nrustfmt = true\n").expect("write");

        let config = Config::from_file(&temp_file).expect("load");
        assert_eq!(config.codegen.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.codegen.domain_crate, "crate");
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.scan, ScanConfig::default());
    }

    #[test]
    fn load_errors_are_reported() {
        match Config::from_file("nonexistent_file.toml") {
            Err(ConfigError::Io { path, .. }) => assert_eq!(path, PathBuf::from("nonexistent_file.toml")),
            other => panic!("Expected Io error, got {:?}", other),
        }

        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        fs::write(&temp_file, "[codegen]\nunknown_key = 1\n").expect("write");
        assert!(matches!(Config::from_file(&temp_file), Err(ConfigError::Parse { .. })));

        fs::write(&temp_file, "[codegen]\nchannel_capacity = 0\n").expect("write");
        match Config::from_file(&temp_file) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "codegen.channel_capacity"),
            other => panic!("Expected Invalid error, got {:?}", other),
        }
    }

    #[test]
    fn save_round_trips() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("portico.toml");
        let mut config = Config::default();
        config.codegen.domain_crate = "::shop".to_string();

        config.save(&path).expect("save");
        assert_eq!(Config::from_file(&path).expect("load"), config);
    }

    #[test]
    fn lookup_prefers_explicit_then_project_then_user() {
        let project = tempdir().expect("project");
        let user = tempdir().expect("user");
        let user_file = user.path().join("config.toml");
        fs::write(&user_file, "").expect("user config");

        let explicit = Path::new("custom.toml");
        assert_eq!(
            Config::locate(Some(explicit), Some(project.path().to_path_buf()), Some(user_file.clone())),
            Some(PathBuf::from("custom.toml"))
        );
        assert_eq!(
            Config::locate(None, Some(project.path().to_path_buf()), Some(user_file.clone())),
            Some(user_file.clone())
        );

        let project_file = project.path().join(PROJECT_CONFIG_FILE);
        fs::write(&project_file, "").expect("project config");
        assert_eq!(
            Config::locate(None, Some(project.path().to_path_buf()), Some(user_file)),
            Some(project_file)
        );
        assert_eq!(Config::locate(None, None, None), None);
    }

    #[test]
    fn test_user_path() {
        if let Ok(path) = Config::user_path() {
            assert!(path.ends_with("portico/config.toml"));
        }
    }
}
