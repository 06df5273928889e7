//! Cypher statements that upsert an [`ExtractedGraph`].
//!
//! Nodes are merged on their `id` property so reruns update in place:
//!
//! ```text
//! (:Space)-[:BOUNDED_BY]->(:Wall)-[:HAS_LAYER]->(:Layer)
//! ```
//!
//! A [`GraphPlan`] is the ordered list of write transactions for one model.

mod param;

pub use param::Param;

use crate::error::Result;
use crate::extract::ExtractedGraph;
use serde::Serialize;
use std::collections::BTreeMap;

const RESET_DATABASE: &str = "MATCH (n) DETACH DELETE n";

const SCHEMA_CONSTRAINTS: [&str; 3] = [
    "CREATE CONSTRAINT space_id IF NOT EXISTS FOR (s:Space) REQUIRE s.id IS UNIQUE",
    "CREATE CONSTRAINT wall_id IF NOT EXISTS FOR (w:Wall) REQUIRE w.id IS UNIQUE",
    "CREATE CONSTRAINT layer_id IF NOT EXISTS FOR (l:Layer) REQUIRE l.id IS UNIQUE",
];

const UPSERT_SPACES: &str = "UNWIND $spaces AS space
MERGE (s:Space {id: space.id})
SET s.name = space.name,
    s.longName = space.longName,
    s.ifcClass = space.ifcClass";

const UPSERT_WALLS: &str = "UNWIND $walls AS wall
MERGE (w:Wall {id: wall.id})
SET w.name = wall.name,
    w.ifcClass = wall.ifcClass,
    w.loadBearing = wall.loadBearing,
    w.isExternal = wall.isExternal,
    w.directionSense = wall.directionSense";

const UPSERT_LAYERS: &str = "UNWIND $layers AS layer
MERGE (l:Layer {id: layer.id})
SET l.name = layer.name,
    l.ifcClass = layer.ifcClass,
    l.layerIndex = layer.layerIndex,
    l.thickness = layer.thickness";

const CREATE_WALL_LAYER_EDGES: &str = "UNWIND $layers AS layer
MATCH (w:Wall {id: layer.wall_id})
MATCH (l:Layer {id: layer.id})
MERGE (w)-[:HAS_LAYER]->(l)
SET l.layerIndex = layer.layerIndex";

const CREATE_SPACE_WALL_EDGES: &str = "UNWIND $edges AS edge
MATCH (s:Space {id: edge.space_id})
MATCH (w:Wall {id: edge.wall_id})
MERGE (s)-[r:BOUNDED_BY]->(w)
SET r.physicalOrVirtual = edge.physicalOrVirtual,
    r.internalOrExternal = edge.internalOrExternal";

/// One parameterized Cypher statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Step name used in logs and errors, e.g. `upsert_walls`.
    pub name: String,
    pub text: String,
    pub params: BTreeMap<String, Param>,
}

impl Statement {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Param) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Render for cypher-shell: `:param` lines followed by the statement.
    pub fn to_script(&self) -> String {
        let mut out = format!("// {}\n", self.name);
        for (key, value) in &self.params {
            out.push_str(&format!(":param {} => {};\n", key, value.to_cypher_literal()));
        }
        out.push_str(&self.text);
        out.push_str(";\n");
        out
    }
}

/// Statements executed in a single write transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Step name, e.g. `upsert_spaces`.
    pub name: String,
    pub statements: Vec<Statement>,
}

/// Options for building a [`GraphPlan`].
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Delete every node and relationship first.
    pub reset_database: bool,
    /// Create uniqueness constraints.
    pub ensure_schema: bool,
    /// Records per UNWIND statement.
    pub batch_size: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            reset_database: true,
            ensure_schema: true,
            batch_size: 1000,
        }
    }
}

impl From<&crate::config::GraphConfig> for PlanOptions {
    fn from(config: &crate::config::GraphConfig) -> Self {
        Self {
            reset_database: config.reset_database,
            ensure_schema: config.ensure_schema,
            batch_size: config.batch_size,
        }
    }
}

/// Ordered write transactions for one extracted graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphPlan {
    pub transactions: Vec<Transaction>,
}

impl GraphPlan {
    /// Build the plan: reset, schema, nodes (spaces, walls, layers), then edges.
    ///
    /// Nodes are written before the edges that `MATCH` them. Steps with no
    /// records are left out.
    pub fn build(graph: &ExtractedGraph, options: &PlanOptions) -> Result<Self> {
        let batch_size = options.batch_size.max(1);
        let mut transactions = Vec::new();

        if options.reset_database {
            transactions.push(Transaction {
                name: "reset_database".to_string(),
                statements: vec![Statement::new("reset_database", RESET_DATABASE)],
            });
        }

        if options.ensure_schema {
            transactions.push(Transaction {
                name: "ensure_schema".to_string(),
                statements: SCHEMA_CONSTRAINTS
                    .iter()
                    .map(|text| Statement::new("ensure_schema", *text))
                    .collect(),
            });
        }

        let steps = [
            unwind_step("upsert_spaces", UPSERT_SPACES, "spaces", &graph.spaces, batch_size)?,
            unwind_step("upsert_walls", UPSERT_WALLS, "walls", &graph.walls, batch_size)?,
            unwind_step("upsert_layers", UPSERT_LAYERS, "layers", &graph.layers, batch_size)?,
            unwind_step(
                "create_wall_layer_edges",
                CREATE_WALL_LAYER_EDGES,
                "layers",
                &graph.layers,
                batch_size,
            )?,
            unwind_step(
                "create_space_wall_edges",
                CREATE_SPACE_WALL_EDGES,
                "edges",
                &graph.space_wall_edges,
                batch_size,
            )?,
        ];
        transactions.extend(steps.into_iter().flatten());

        Ok(Self { transactions })
    }

    pub fn statement_count(&self) -> usize {
        self.transactions.iter().map(|t| t.statements.len()).sum()
    }

    /// Render the whole plan as a cypher-shell script.
    pub fn to_script(&self) -> String {
        let mut out = String::from("// Generated by bim2graph\n");
        for tx in &self.transactions {
            out.push_str(&format!("\n// ---- {} ----\n:begin\n", tx.name));
            for statement in &tx.statements {
                out.push_str(&statement.to_script());
            }
            out.push_str(":commit\n");
        }
        out
    }
}

/// One transaction of `UNWIND $param` statements over `records` in chunks of `batch_size`.
fn unwind_step<T: Serialize>(
    name: &str,
    text: &str,
    param: &str,
    records: &[T],
    batch_size: usize,
) -> Result<Option<Transaction>> {
    if records.is_empty() {
        return Ok(None);
    }

    let statements = records
        .chunks(batch_size)
        .map(|chunk| -> Result<Statement> {
            Ok(Statement::new(name, text).with_param(param, Param::from_records(chunk)?))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(Transaction {
        name: name.to_string(),
        statements,
    }))
}
