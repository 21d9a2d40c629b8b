use crate::domain::model::{AuditRecord, JobConfig, TickContext};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::future::Future;

/// Resolves the startup job's configuration, usually from a remote service.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch_config(&self) -> Result<JobConfig>;
}

/// Unit of work fired on every tick of a recurring job.
///
/// Implementations must not block: the registry awaits the returned future on
/// the shared runtime.
#[async_trait]
pub trait JobTask: Send + Sync {
    async fn run(&self, ctx: TickContext) -> Result<()>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn persist(&self, message: String) -> Result<AuditRecord>;
    async fn list_all(&self) -> Result<Vec<AuditRecord>>;
    async fn count(&self) -> Result<u64>;
}

/// Adapter binding an async closure as a [`JobTask`].
pub struct FnTask<F>(F);

pub fn task_fn<F, Fut>(f: F) -> FnTask<F>
where
    F: Fn(TickContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnTask(f)
}

#[async_trait]
impl<F, Fut> JobTask for FnTask<F>
where
    F: Fn(TickContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn run(&self, ctx: TickContext) -> Result<()> {
        (self.0)(ctx).await
    }
}
