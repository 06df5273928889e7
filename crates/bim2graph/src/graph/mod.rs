//! Graph database writers.
//!
//! A [`GraphWriter`] executes one [`Transaction`] of a plan at a time:
//!
//! - [`Neo4jWriter`]: Bolt connection to a Neo4j server
//! - [`ScriptWriter`]: cypher-shell script on disk
//! - [`MemoryWriter`]: records transactions in memory

mod memory;
mod neo4j;
mod script;

pub use memory::MemoryWriter;
pub use neo4j::Neo4jWriter;
pub use script::ScriptWriter;

use crate::cypher::Transaction;
use crate::error::Result;
use async_trait::async_trait;

/// Executes write transactions against a graph store.
#[async_trait]
pub trait GraphWriter: Send + Sync {
    /// Run every statement of `tx` atomically.
    async fn execute(&self, tx: &Transaction) -> Result<()>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Flush buffered output after the last transaction.
    async fn finish(&self) -> Result<()> {
        Ok(())
    }

    /// Writer type identifier (e.g. "neo4j", "script").
    fn kind(&self) -> &str;
}
