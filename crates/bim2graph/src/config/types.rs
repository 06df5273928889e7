//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IFC model to read.
    pub source: SourceConfig,

    /// Graph database connection.
    pub neo4j: Neo4jConfig,

    /// Graph write behavior.
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Source model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the IFC (STEP physical file) model.
    pub path: PathBuf,
}

/// Neo4j connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    /// Bolt URI, e.g. `neo4j://127.0.0.1:7687`.
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Username.
    #[serde(default = "default_user")]
    pub user: String,

    /// Password. Falls back to `NEO4J_PASSWORD` when empty.
    #[serde(default)]
    pub password: String,

    /// Database name (server default when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Maximum pooled Bolt connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: String::new(),
            database: None,
            max_connections: default_max_connections(),
        }
    }
}

impl fmt::Debug for Neo4jConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neo4jConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Graph write behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Delete every node and relationship before writing (default: true).
    #[serde(default = "default_true")]
    pub reset_database: bool,

    /// Create uniqueness constraints before writing (default: true).
    #[serde(default = "default_true")]
    pub ensure_schema: bool,

    /// Records per UNWIND statement (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            reset_database: true,
            ensure_schema: true,
            batch_size: default_batch_size(),
        }
    }
}

// Default value functions for serde
fn default_uri() -> String {
    "neo4j://127.0.0.1:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> usize {
    4
}

fn default_batch_size() -> usize {
    1000
}

fn default_true() -> bool {
    true
}
