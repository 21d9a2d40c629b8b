use crate::core::AuditStore;
use crate::domain::model::AuditRecord;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub const AUDIT_LOG_FILE: &str = "audit_log.jsonl";

#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn persist(&self, message: String) -> Result<AuditRecord> {
        let mut records = self.records.lock().await;
        let record = AuditRecord {
            id: records.len() as u64 + 1,
            message,
            created_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<AuditRecord>> {
        Ok(self.records.lock().await.clone())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.lock().await.len() as u64)
    }
}

/// Appends one JSON record per line to `<base_path>/audit_log.jsonl`.
#[derive(Debug)]
pub struct FileAuditStore {
    base_path: PathBuf,
    // Last id written; `None` until the file has been scanned.
    last_id: Mutex<Option<u64>>,
}

impl FileAuditStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            last_id: Mutex::new(None),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.base_path.join(AUDIT_LOG_FILE)
    }

    async fn read_records(path: &Path) -> Result<Vec<AuditRecord>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl AuditStore for FileAuditStore {
    async fn persist(&self, message: String) -> Result<AuditRecord> {
        // 序列化寫入以確保 id 不重複
        let mut last_id = self.last_id.lock().await;
        let path = self.file_path();

        let previous = match *last_id {
            Some(id) => id,
            None => Self::read_records(&path)
                .await?
                .iter()
                .map(|r| r.id)
                .max()
                .unwrap_or(0),
        };

        let record = AuditRecord {
            id: previous + 1,
            message,
            created_at: Utc::now(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        *last_id = Some(record.id);
        tracing::debug!("Audit record {} written to {}", record.id, path.display());
        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<AuditRecord>> {
        let _guard = self.last_id.lock().await;
        Self::read_records(&self.file_path()).await
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.list_all().await?.len() as u64)
    }
}
