//! Import configuration.
//!
//! Precedence, highest first: CLI flag, environment variable, config file,
//! default. This module covers the file and environment layers; the binary
//! applies CLI overrides on top.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::parser::ErrorPolicy;
use crate::report::OutputFormat;
use crate::source::DEFAULT_ENCODING;

pub const ENV_ERROR_POLICY: &str = "DSL_NORMALIZE_ERROR_POLICY";
pub const ENV_ENCODING: &str = "DSL_NORMALIZE_ENCODING";
pub const ENV_FORMAT: &str = "DSL_NORMALIZE_FORMAT";
pub const ENV_INCLUDE_ATTRIBUTE_LINKS: &str = "DSL_NORMALIZE_INCLUDE_ATTRIBUTE_LINKS";

/// Error type for configuration loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io { path: String, message: String },
    Yaml(String),
    InvalidValue { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "Failed to read config file {}: {}", path, message)
            }
            ConfigError::Yaml(msg) => write!(f, "Failed to parse YAML: {}", msg),
            ConfigError::InvalidValue { key, message } => {
                write!(f, "Invalid value for {}: {}", key, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings for one import run.
///
/// # Example
/// ```
/// use dsl_normalize::{ErrorPolicy, ImportConfig};
///
/// let config = ImportConfig::from_yaml_str("error_policy: collect\n").unwrap();
/// assert_eq!(config.error_policy, ErrorPolicy::Collect);
/// assert_eq!(config.encoding, "utf-16");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// What to do with invalid body lines
    pub error_policy: ErrorPolicy,
    /// Also report the attribute/translation join table
    pub include_attribute_links: bool,
    /// Encoding label used when the source has no BOM
    pub encoding: String,
    /// Report format
    pub format: OutputFormat,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::default(),
            include_attribute_links: false,
            encoding: DEFAULT_ENCODING.to_string(),
            format: OutputFormat::default(),
        }
    }
}

impl ImportConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or has an invalid format
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_ERROR_POLICY) {
            self.error_policy = value.parse().map_err(|message| ConfigError::InvalidValue {
                key: ENV_ERROR_POLICY.to_string(),
                message,
            })?;
        }

        if let Some(value) = lookup(ENV_ENCODING) {
            self.encoding = value;
        }

        if let Some(value) = lookup(ENV_FORMAT) {
            self.format = value.parse().map_err(|message| ConfigError::InvalidValue {
                key: ENV_FORMAT.to_string(),
                message,
            })?;
        }

        if let Some(value) = lookup(ENV_INCLUDE_ATTRIBUTE_LINKS) {
            self.include_attribute_links = parse_flag(&value).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: ENV_INCLUDE_ATTRIBUTE_LINKS.to_string(),
                    message: format!("expected a boolean, got '{}'", value),
                }
            })?;
        }

        Ok(self)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
