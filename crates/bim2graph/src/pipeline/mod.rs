//! Pipeline orchestrator - load, extract, plan, write.

use crate::config::Config;
use crate::cypher::{GraphPlan, PlanOptions};
use crate::error::{Bim2GraphError, Result};
use crate::extract::{extract_graph, ExtractedGraph};
use crate::graph::GraphWriter;
use crate::ifc::IfcModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs one IFC model into a graph writer.
pub struct Pipeline {
    config: Config,
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Writer the graph went to ("neo4j", "script", ...).
    pub target: String,

    /// Source IFC path.
    pub source: PathBuf,

    /// SHA256 of the source file.
    pub source_sha256: String,

    /// SHA256 of the effective configuration.
    pub config_sha256: String,

    /// `FILE_SCHEMA` of the source model.
    pub schema: Option<String>,

    pub spaces: usize,
    pub walls: usize,
    pub layers: usize,
    pub space_wall_edges: usize,

    /// Statements executed.
    pub statements: usize,

    /// Write transactions committed.
    pub transactions: usize,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl RunResult {
    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Outcome of [`Pipeline::health_check`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub target: String,
    pub connected: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub healthy: bool,
}

/// Source model and what was extracted from it.
#[derive(Debug)]
pub struct Extraction {
    pub source_sha256: String,
    pub graph: ExtractedGraph,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the model and extract its graph records.
    pub fn extract(&self) -> Result<Extraction> {
        let model = IfcModel::open(&self.config.source.path)?;
        if let Some(schema) = model.schema() {
            if !schema.to_ascii_uppercase().starts_with("IFC") {
                return Err(Bim2GraphError::Extract(format!(
                    "{:?} is a {} file, not an IFC model",
                    self.config.source.path, schema
                )));
            }
        }
        let source_sha256 = model.source_sha256().unwrap_or_default().to_string();

        let graph = extract_graph(&model);
        Ok(Extraction {
            source_sha256,
            graph,
        })
    }

    /// Build the write plan for an extracted graph.
    pub fn plan(&self, graph: &ExtractedGraph) -> Result<GraphPlan> {
        GraphPlan::build(graph, &PlanOptions::from(&self.config.graph))
    }

    /// Run the full pipeline into `writer`.
    ///
    /// Cancellation is honoured between transactions; a transaction that has
    /// started is allowed to commit.
    pub async fn run(
        &self,
        writer: &dyn GraphWriter,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!("Starting run {} ({} target)", run_id, writer.kind());

        // Phase 1: Load and extract
        info!("Phase 1: Extracting graph from {:?}", self.config.source.path);
        let extraction = self.extract()?;
        let graph = &extraction.graph;

        // Phase 2: Plan
        let plan = self.plan(graph)?;
        info!(
            "Phase 2: Planned {} transactions, {} statements",
            plan.transactions.len(),
            plan.statement_count()
        );

        // Phase 3: Write
        info!("Phase 3: Writing to {}", writer.kind());
        let mut committed = 0;
        let mut statements = 0;
        for tx in &plan.transactions {
            if cancel.is_cancelled() {
                info!("Run cancelled after {} transactions", committed);
                return Err(Bim2GraphError::Cancelled);
            }
            if let Err(e) = writer.execute(tx).await {
                error!("Transaction {} failed: {}", tx.name, e);
                return Err(e);
            }
            committed += 1;
            statements += tx.statements.len();
            info!("Committed {} ({} statements)", tx.name, tx.statements.len());
        }
        writer.finish().await?;

        let completed_at = Utc::now();
        let result = RunResult {
            run_id,
            status: "completed".to_string(),
            target: writer.kind().to_string(),
            source: self.config.source.path.clone(),
            source_sha256: extraction.source_sha256,
            config_sha256: self.config.hash(),
            schema: graph.schema.clone(),
            spaces: graph.spaces.len(),
            walls: graph.walls.len(),
            layers: graph.layers.len(),
            space_wall_edges: graph.space_wall_edges.len(),
            statements,
            transactions: committed,
            started_at,
            completed_at,
            duration_seconds: timer.elapsed().as_secs_f64(),
        };

        info!(
            "Graph generation complete: {} nodes, {} edges in {:.2}s",
            graph.node_count(),
            graph.edge_count(),
            result.duration_seconds
        );

        Ok(result)
    }

    /// Check that the writer's store is reachable.
    pub async fn health_check(&self, writer: &dyn GraphWriter) -> HealthCheckResult {
        let start = Instant::now();
        let outcome = writer.ping().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let error = outcome.err().map(|e| e.to_string());
        HealthCheckResult {
            target: writer.kind().to_string(),
            connected: error.is_none(),
            latency_ms,
            healthy: error.is_none(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GraphConfig, Neo4jConfig, SourceConfig};
    use crate::cypher::Transaction;
    use crate::graph::MemoryWriter;
    use async_trait::async_trait;
    use std::path::Path;

    /// Records transactions and cancels the run once `after` have committed.
    struct CancellingWriter {
        inner: MemoryWriter,
        cancel: CancellationToken,
        after: usize,
    }

    #[async_trait]
    impl GraphWriter for CancellingWriter {
        async fn execute(&self, tx: &Transaction) -> Result<()> {
            self.inner.execute(tx).await?;
            if self.inner.executed().len() >= self.after {
                self.cancel.cancel();
            }
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        fn kind(&self) -> &str {
            "cancelling"
        }
    }

    const FIXTURE: &str = include_str!("../../tests/fixtures/duplex_minimal.ifc");

    fn config(path: &Path) -> Config {
        Config {
            source: SourceConfig {
                path: path.to_path_buf(),
            },
            neo4j: Neo4jConfig {
                uri: "neo4j://127.0.0.1:7687".to_string(),
                user: "neo4j".to_string(),
                password: String::new(),
                database: None,
                max_connections: 4,
            },
            graph: GraphConfig::default(),
        }
    }

    fn fixture_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duplex.ifc");
        std::fs::write(&path, FIXTURE).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_run_writes_plan_in_order() {
        let (_dir, path) = fixture_file();
        let pipeline = Pipeline::new(config(&path));
        let writer = MemoryWriter::new();

        let result = pipeline
            .run(&writer, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, "completed");
        assert_eq!(result.target, "memory");
        assert_eq!(result.schema.as_deref(), Some("IFC2X3"));
        assert_eq!(
            (result.spaces, result.walls, result.layers, result.space_wall_edges),
            (2, 2, 5, 3)
        );
        assert_eq!(result.transactions, 7);
        assert_eq!(result.statements, 9);
        assert_eq!(result.source_sha256.len(), 64);
        assert_eq!(result.config_sha256, pipeline.config().hash());

        let executed = writer.executed();
        assert_eq!(executed.first().unwrap().name, "reset_database");
        assert_eq!(executed.last().unwrap().name, "create_space_wall_edges");
    }

    #[tokio::test]
    async fn test_run_cancelled_before_writing() {
        let (_dir, path) = fixture_file();
        let pipeline = Pipeline::new(config(&path));
        let writer = MemoryWriter::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline.run(&writer, cancel).await.unwrap_err();
        assert!(matches!(err, Bim2GraphError::Cancelled));
        assert!(writer.executed().is_empty());
    }

    #[tokio::test]
    async fn test_run_cancelled_between_transactions() {
        let (_dir, path) = fixture_file();
        let pipeline = Pipeline::new(config(&path));
        let cancel = CancellationToken::new();
        let writer = CancellingWriter {
            inner: MemoryWriter::new(),
            cancel: cancel.clone(),
            after: 3,
        };

        let err = pipeline.run(&writer, cancel).await.unwrap_err();
        assert!(matches!(err, Bim2GraphError::Cancelled));
        assert_eq!(err.exit_code(), crate::error::EXIT_CANCELLED);

        let names: Vec<String> = writer.inner.executed().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["reset_database", "ensure_schema", "upsert_spaces"]);
    }

    #[tokio::test]
    async fn test_run_rejects_non_ifc_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bracket.stp");
        std::fs::write(
            &path,
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('AUTOMOTIVE_DESIGN'));\nENDSEC;\nDATA;\nENDSEC;\nEND-ISO-10303-21;\n",
        )
        .unwrap();

        let writer = MemoryWriter::new();
        let err = Pipeline::new(config(&path))
            .run(&writer, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Bim2GraphError::Extract(_)));
        assert_eq!(err.exit_code(), crate::error::EXIT_EXTRACT_ERROR);
        assert!(writer.executed().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_at_failed_transaction() {
        let (_dir, path) = fixture_file();
        let pipeline = Pipeline::new(config(&path));
        let writer = MemoryWriter::failing_on("upsert_layers");

        let err = pipeline
            .run(&writer, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_GRAPH_ERROR);

        let names: Vec<String> = writer.executed().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["reset_database", "ensure_schema", "upsert_spaces", "upsert_walls"]
        );
    }

    #[tokio::test]
    async fn test_run_missing_source() {
        let pipeline = Pipeline::new(config(Path::new("/nonexistent/model.ifc")));
        let err = pipeline
            .run(&MemoryWriter::new(), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_IO_ERROR);
    }

    #[tokio::test]
    async fn test_health_check() {
        let pipeline = Pipeline::new(config(Path::new("unused.ifc")));

        let ok = pipeline.health_check(&MemoryWriter::new()).await;
        assert!(ok.healthy && ok.connected);
        assert!(ok.error.is_none());

        let failed = pipeline
            .health_check(&MemoryWriter::failing_on("ping"))
            .await;
        assert!(!failed.healthy);
        assert!(failed.error.unwrap().contains("injected failure"));
    }

    #[test]
    fn test_result_json() {
        let (_dir, path) = fixture_file();
        let pipeline = Pipeline::new(config(&path));
        let extraction = pipeline.extract().unwrap();
        assert_eq!(extraction.graph.walls.len(), 2);

        let now = Utc::now();
        let result = RunResult {
            run_id: "r".into(),
            status: "completed".into(),
            target: "memory".into(),
            source: path,
            source_sha256: extraction.source_sha256,
            config_sha256: String::new(),
            schema: None,
            spaces: 0,
            walls: 2,
            layers: 0,
            space_wall_edges: 0,
            statements: 0,
            transactions: 0,
            started_at: now,
            completed_at: now,
            duration_seconds: 0.5,
        };
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["walls"], 2);
        assert_eq!(json["status"], "completed");
    }
}
