pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;

pub use adapters::{
    FileAuditStore, HttpConfigSource, InMemoryAuditStore, MockParameterSource, StaticConfigSource,
};
pub use app::{AuditJob, AuditService};
pub use config::AppConfig;
pub use crate::core::orchestrator::{StartupOrchestrator, StartupOutcome, StartupSettings, StartupState};
pub use crate::core::registry::{JobHandle, JobRegistry};
pub use domain::model::{ConflictPolicy, JobConfig, JobSpec, OverlapPolicy, StartMode, TickContext};
pub use domain::ports::{task_fn, AuditStore, ConfigSource, JobTask};
pub use utils::error::{Result, SchedulerError};
