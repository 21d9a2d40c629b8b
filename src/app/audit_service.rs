use crate::core::{AuditStore, JobTask, TickContext};
use crate::domain::model::{AuditRecord, CountResponse};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub const DEFAULT_JOB_SOURCE: &str = "StartupOrchestrator";

/// Writes and reads audit records through an [`AuditStore`].
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuditStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub async fn create_log(&self, source: &str) -> Result<AuditRecord> {
        tracing::info!("Persisting audit record from: [{}]", source);
        self.store.persist(format!("Log from: {}", source)).await
    }

    pub async fn list_logs(&self) -> Result<Vec<AuditRecord>> {
        self.store.list_all().await
    }

    pub async fn count_logs(&self) -> Result<CountResponse> {
        Ok(CountResponse {
            count: self.store.count().await?,
        })
    }
}

/// Recurring task that writes one audit record per tick.
pub struct AuditJob {
    service: AuditService,
    source: String,
}

impl AuditJob {
    pub fn new(service: AuditService, source: impl Into<String>) -> Self {
        Self {
            service,
            source: source.into(),
        }
    }
}

#[async_trait]
impl JobTask for AuditJob {
    async fn run(&self, ctx: TickContext) -> Result<()> {
        tracing::debug!("Running async task for job '{}' (tick {})", ctx.job_name, ctx.tick);
        self.service.create_log(&self.source).await?;
        Ok(())
    }
}
