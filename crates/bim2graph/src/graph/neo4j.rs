//! Neo4j writer over the Bolt protocol.

use super::GraphWriter;
use crate::config::Neo4jConfig;
use crate::cypher::{Param, Statement, Transaction};
use crate::error::{Bim2GraphError, Result};
use async_trait::async_trait;
use neo4rs::{query, BoltNull, BoltType, ConfigBuilder, Graph, Query};
use std::collections::HashMap;
use tracing::{debug, info};

/// Writes transactions to Neo4j; each plan step is one explicit transaction.
pub struct Neo4jWriter {
    graph: Graph,
    uri: String,
}

impl Neo4jWriter {
    /// Connect using the given configuration.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections);
        if let Some(ref database) = config.database {
            builder = builder.db(database.as_str());
        }

        let graph = Graph::connect(builder.build()?).await?;
        info!("Neo4j driver initiated for {}", config.uri);

        Ok(Self {
            graph,
            uri: config.uri.clone(),
        })
    }
}

#[async_trait]
impl GraphWriter for Neo4jWriter {
    async fn execute(&self, tx: &Transaction) -> Result<()> {
        let mut txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| Bim2GraphError::graph(&tx.name, e.to_string()))?;

        for statement in &tx.statements {
            debug!("Running {} on {}", statement.name, self.uri);
            if let Err(e) = txn.run(to_query(statement)).await {
                if let Err(rollback) = txn.rollback().await {
                    debug!("Rollback of {} failed: {}", tx.name, rollback);
                }
                return Err(Bim2GraphError::graph(&statement.name, e.to_string()));
            }
        }

        txn.commit()
            .await
            .map_err(|e| Bim2GraphError::graph(&tx.name, e.to_string()))
    }

    async fn ping(&self) -> Result<()> {
        self.graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| Bim2GraphError::graph("ping", e.to_string()))
    }

    fn kind(&self) -> &str {
        "neo4j"
    }
}

fn to_query(statement: &Statement) -> Query {
    statement
        .params
        .iter()
        .fold(query(&statement.text), |q, (key, value)| {
            q.param(key, to_bolt(value))
        })
}

/// Convert a parameter into the driver's value type.
fn to_bolt(param: &Param) -> BoltType {
    match param {
        Param::Null => BoltType::Null(BoltNull),
        Param::Bool(b) => BoltType::from(*b),
        Param::Int(i) => BoltType::from(*i),
        Param::Float(f) => BoltType::from(*f),
        Param::String(s) => BoltType::from(s.as_str()),
        Param::List(items) => BoltType::from(items.iter().map(to_bolt).collect::<Vec<_>>()),
        Param::Map(entries) => BoltType::from(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), to_bolt(v)))
                .collect::<HashMap<String, BoltType>>(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_to_bolt_scalars() {
        assert_eq!(to_bolt(&Param::Null), BoltType::Null(BoltNull));
        assert_eq!(to_bolt(&Param::Bool(true)), BoltType::from(true));
        assert_eq!(to_bolt(&Param::Int(7)), BoltType::from(7i64));
        assert_eq!(to_bolt(&Param::String("a".into())), BoltType::from("a"));
    }

    #[test]
    fn test_to_bolt_nested() {
        let mut map = BTreeMap::new();
        map.insert("id".to_string(), Param::String("w1".into()));
        map.insert("thickness".to_string(), Param::Null);
        let bolt = to_bolt(&Param::List(vec![Param::Map(map)]));

        let BoltType::List(list) = bolt else {
            panic!("expected list");
        };
        assert_eq!(list.len(), 1);
        let BoltType::Map(ref row) = list.value[0] else {
            panic!("expected map");
        };
        assert_eq!(row.value.len(), 2);
    }
}
