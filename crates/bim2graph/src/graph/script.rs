//! Writes the plan as a cypher-shell script instead of executing it.

use super::GraphWriter;
use crate::cypher::Transaction;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::info;

/// Appends each transaction to a `.cypher` file wrapped in `:begin` / `:commit`.
///
/// Output goes to `<path>.partial` and replaces `path` only in
/// [`GraphWriter::finish`]. A writer dropped before that removes the partial
/// file and leaves `path` as it was.
pub struct ScriptWriter {
    path: PathBuf,
    partial: PathBuf,
    out: Mutex<BufWriter<File>>,
    finished: AtomicBool,
}

impl ScriptWriter {
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let partial = partial_path(&path);
        let mut out = BufWriter::new(File::create(&partial).await?);
        out.write_all(b"// Generated by bim2graph\n").await?;
        Ok(Self {
            path,
            partial,
            out: Mutex::new(out),
            finished: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl GraphWriter for ScriptWriter {
    async fn execute(&self, tx: &Transaction) -> Result<()> {
        let mut block = format!("\n// ---- {} ----\n:begin\n", tx.name);
        for statement in &tx.statements {
            block.push_str(&statement.to_script());
        }
        block.push_str(":commit\n");

        let mut out = self.out.lock().await;
        out.write_all(block.as_bytes()).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        self.out.lock().await.flush().await?;
        tokio::fs::rename(&self.partial, &self.path).await?;
        self.finished.store(true, Ordering::SeqCst);
        info!("Cypher script written to {:?}", self.path);
        Ok(())
    }

    fn kind(&self) -> &str {
        "script"
    }
}

impl Drop for ScriptWriter {
    fn drop(&mut self) {
        if !self.finished.load(Ordering::SeqCst) {
            let _ = std::fs::remove_file(&self.partial);
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
