//! Configuration management

use crate::error::{StressvizError, StressvizResult};
use crate::types::{AuthConfig, EmailMatch, StorageBackend, StorageConfig, StressvizConfig};

use std::path::{Path, PathBuf};

impl Default for StressvizConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: "~/.stressviz/storage".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: 800,
            email_match: EmailMatch::Exact,
            min_password_length: 6,
            event_buffer: 64,
        }
    }
}

impl StorageConfig {
    /// Resolve `data_dir`, expanding a leading `~` against `home`
    pub fn resolve_data_dir(&self, home: Option<&Path>) -> PathBuf {
        match (self.data_dir.strip_prefix('~'), home) {
            (Some(rest), Some(home)) => {
                home.join(rest.trim_start_matches(|c: char| c == '/' || c == '\\'))
            }
            _ => PathBuf::from(&self.data_dir),
        }
    }
}

impl StressvizConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> StressvizResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StressvizError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: StressvizConfig =
            toml::from_str(&content).map_err(|e| StressvizError::Config {
                message: format!("Failed to parse config: {}", e),
                source: Some(Box::new(e)),
                context: crate::ErrorContext::new("config")
                    .with_operation("parse_toml")
                    .with_suggestion("Check TOML syntax in config file"),
            })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> StressvizResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| StressvizError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| StressvizError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> StressvizResult<()> {
        if self.auth.min_password_length == 0 {
            return Err(StressvizError::Config {
                message: "auth.min_password_length must be greater than 0".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set auth.min_password_length to a positive value"),
            });
        }

        if self.auth.event_buffer == 0 {
            return Err(StressvizError::Config {
                message: "auth.event_buffer must be greater than 0".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set auth.event_buffer to a positive value"),
            });
        }

        if self.storage.backend == StorageBackend::File && self.storage.data_dir.trim().is_empty()
        {
            return Err(StressvizError::Config {
                message: "storage.data_dir must be set for the file backend".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set storage.data_dir or use backend = \"memory\""),
            });
        }

        Ok(())
    }
}
