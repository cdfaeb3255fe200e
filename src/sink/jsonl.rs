//! JSON-lines decision log

use super::{DecisionSink, SinkError};
use crate::decision::Decision;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// Appends one JSON object per decision to a file
#[derive(Debug, Clone)]
pub struct JsonlDecisionSink {
    path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl JsonlDecisionSink {
    /// Open `path` for appending, creating it if needed
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DecisionSink for JsonlDecisionSink {
    async fn on_decision(&self, decision: &Decision) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(decision)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}
