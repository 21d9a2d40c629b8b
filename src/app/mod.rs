pub mod audit_service;

pub use audit_service::{AuditJob, AuditService, DEFAULT_JOB_SOURCE};
