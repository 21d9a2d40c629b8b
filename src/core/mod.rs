pub mod interval;
pub mod orchestrator;
pub mod registry;

pub use crate::domain::model::{JobConfig, JobSpec, TickContext};
pub use crate::domain::ports::{AuditStore, ConfigSource, JobTask};
pub use crate::utils::error::Result;
