//! Deployment configuration lookup.
//!
//! The configuration file is a TOML table of application sections, each
//! naming the scaling group to deploy:
//!
//! ```toml
//! [checkout]
//! auto_scaling_group = "checkout-asg"
//!
//! [search]
//! auto_scaling_group = "search-asg"
//! ```

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors resolving the target scaling group from the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no configuration for application '{0}'")]
    UnknownApplication(String),

    #[error("application '{0}' has no 'auto_scaling_group' key")]
    MissingGroup(String),
}

impl ConfigError {
    /// An unreadable or unparsable file is exit code 1; a missing
    /// application section or key is exit code 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::Read { .. } | ConfigError::Parse { .. } => 1,
            ConfigError::UnknownApplication(_) | ConfigError::MissingGroup(_) => 2,
        }
    }
}

/// Resolve the scaling group configured for `application`.
pub fn scaling_group_for(path: &Path, application: &str) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let table: toml::Table = content.parse().map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let section = table
        .get(application)
        .and_then(|value| value.as_table())
        .ok_or_else(|| ConfigError::UnknownApplication(application.to_string()))?;

    section
        .get("auto_scaling_group")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingGroup(application.to_string()))
}
