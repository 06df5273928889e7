//! # bim2graph
//!
//! Turns a Building Information Model (IFC) into a property graph.
//!
//! The library reads an IFC file in STEP physical file encoding, extracts:
//!
//! - **Spaces** (`IfcSpace`) as `:Space` nodes
//! - **Walls** (`IfcWall` and subtypes) as `:Wall` nodes with `LoadBearing` / `IsExternal`
//! - **Material layers** of each wall as `:Layer` nodes linked by `HAS_LAYER`
//! - **Space boundaries** to walls as `BOUNDED_BY` relationships
//!
//! and upserts them into Neo4j with parameterized `MERGE` / `SET` statements,
//! or renders them as a cypher-shell script.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bim2graph::{Config, Neo4jWriter, Pipeline};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> bim2graph::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let writer = Neo4jWriter::connect(&config.neo4j).await?;
//!     let result = Pipeline::new(config).run(&writer, CancellationToken::new()).await?;
//!     println!("Wrote {} walls", result.walls);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cypher;
pub mod error;
pub mod extract;
pub mod graph;
pub mod ifc;
pub mod pipeline;

// Re-exports for convenient access
pub use config::{Config, GraphConfig, Neo4jConfig, SourceConfig};
pub use cypher::{GraphPlan, Param, PlanOptions, Statement, Transaction};
pub use error::{Bim2GraphError, Result};
pub use extract::{extract_graph, ExtractedGraph, LayerNode, SpaceNode, SpaceWallEdge, WallNode};
pub use graph::{GraphWriter, MemoryWriter, Neo4jWriter, ScriptWriter};
pub use ifc::IfcModel;
pub use pipeline::{HealthCheckResult, Pipeline, RunResult};
