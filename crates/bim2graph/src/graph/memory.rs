//! In-memory writer for dry runs and tests.

use super::GraphWriter;
use crate::cypher::Transaction;
use crate::error::{Bim2GraphError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// Records every executed transaction.
#[derive(Default)]
pub struct MemoryWriter {
    executed: Mutex<Vec<Transaction>>,
    fail_on: Option<String>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when a transaction with this step name is executed.
    pub fn failing_on(step: impl Into<String>) -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            fail_on: Some(step.into()),
        }
    }

    /// Transactions executed so far, in order.
    pub fn executed(&self) -> Vec<Transaction> {
        self.executed
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GraphWriter for MemoryWriter {
    async fn execute(&self, tx: &Transaction) -> Result<()> {
        if self.fail_on.as_deref() == Some(tx.name.as_str()) {
            return Err(Bim2GraphError::graph(&tx.name, "injected failure"));
        }
        self.executed
            .lock()
            .map_err(|_| Bim2GraphError::graph(&tx.name, "writer state poisoned"))?
            .push(tx.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        match self.fail_on.as_deref() {
            Some("ping") => Err(Bim2GraphError::graph("ping", "injected failure")),
            _ => Ok(()),
        }
    }

    fn kind(&self) -> &str {
        "memory"
    }
}
