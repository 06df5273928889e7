//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Environment variable that supplies the Neo4j password when the config leaves it empty.
pub const PASSWORD_ENV: &str = "NEO4J_PASSWORD";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        if config.neo4j.password.is_empty() {
            if let Ok(password) = std::env::var(PASSWORD_ENV) {
                config.neo4j.password = password;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Configuration for `path` with default connection and graph settings.
    pub fn for_source<P: Into<PathBuf>>(path: P) -> Self {
        Config {
            source: SourceConfig { path: path.into() },
            neo4j: Neo4jConfig::default(),
            graph: GraphConfig::default(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
