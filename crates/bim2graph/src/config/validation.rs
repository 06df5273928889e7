//! Configuration validation.

use super::Config;
use crate::error::{Bim2GraphError, Result};

/// URI schemes accepted by the Bolt driver.
const BOLT_SCHEMES: &[&str] = &["neo4j", "neo4j+s", "neo4j+ssc", "bolt", "bolt+s", "bolt+ssc"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.path.as_os_str().is_empty() {
        return Err(Bim2GraphError::Config("source.path is required".into()));
    }

    let scheme = config.neo4j.uri.split("://").next().unwrap_or_default();
    if !config.neo4j.uri.contains("://") || !BOLT_SCHEMES.contains(&scheme) {
        return Err(Bim2GraphError::Config(format!(
            "neo4j.uri must use one of {:?}, got '{}'",
            BOLT_SCHEMES, config.neo4j.uri
        )));
    }
    if config.neo4j.user.is_empty() {
        return Err(Bim2GraphError::Config("neo4j.user is required".into()));
    }
    if config.neo4j.max_connections == 0 {
        return Err(Bim2GraphError::Config(
            "neo4j.max_connections must be at least 1".into(),
        ));
    }
    if config.graph.batch_size == 0 {
        return Err(Bim2GraphError::Config(
            "graph.batch_size must be at least 1".into(),
        ));
    }

    Ok(())
}
