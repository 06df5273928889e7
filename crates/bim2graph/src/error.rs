//! Error types for the bim2graph library.

use thiserror::Error;

/// Process exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code for IFC parse errors.
pub const EXIT_PARSE_ERROR: u8 = 2;
/// Process exit code for graph database errors.
pub const EXIT_GRAPH_ERROR: u8 = 3;
/// Process exit code for extraction errors.
pub const EXIT_EXTRACT_ERROR: u8 = 4;
/// Process exit code for IO errors (missing files, permissions).
pub const EXIT_IO_ERROR: u8 = 7;
/// Process exit code when the run was interrupted by a signal.
pub const EXIT_CANCELLED: u8 = 130;

/// Main error type for bim2graph operations.
#[derive(Error, Debug)]
pub enum Bim2GraphError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IFC file could not be parsed
    #[error("IFC parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Entity extraction failed
    #[error("Extraction failed: {0}")]
    Extract(String),

    /// Graph database error with the statement that failed
    #[error("Graph database error in {statement}: {message}")]
    Graph { statement: String, message: String },

    /// Driver-level error from the Bolt client
    #[error("Neo4j driver error: {0}")]
    Driver(#[from] neo4rs::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Run cancelled")]
    Cancelled,
}

impl Bim2GraphError {
    /// Create a Parse error at the given 1-based line.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Bim2GraphError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a Graph error for a named statement.
    pub fn graph(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Bim2GraphError::Graph {
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Bim2GraphError::Config(_) | Bim2GraphError::Yaml(_) => EXIT_CONFIG_ERROR,
            Bim2GraphError::Parse { .. } => EXIT_PARSE_ERROR,
            Bim2GraphError::Graph { .. } | Bim2GraphError::Driver(_) => EXIT_GRAPH_ERROR,
            Bim2GraphError::Extract(_) | Bim2GraphError::Json(_) => EXIT_EXTRACT_ERROR,
            Bim2GraphError::Io(_) => EXIT_IO_ERROR,
            Bim2GraphError::Cancelled => EXIT_CANCELLED,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for bim2graph operations.
pub type Result<T> = std::result::Result<T, Bim2GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Bim2GraphError::Config("x".into()).exit_code(), 1);
        assert_eq!(Bim2GraphError::parse(3, "bad").exit_code(), 2);
        assert_eq!(Bim2GraphError::graph("upsert_walls", "boom").exit_code(), 3);
        assert_eq!(Bim2GraphError::Cancelled.exit_code(), 130);

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(Bim2GraphError::from(io).exit_code(), 7);
    }

    #[test]
    fn test_parse_error_message_includes_line() {
        let err = Bim2GraphError::parse(42, "unterminated string");
        assert_eq!(
            err.to_string(),
            "IFC parse error at line 42: unterminated string"
        );
        assert!(err.format_detailed().starts_with("Error: IFC parse error"));
    }
}
