use crate::domain::ports::JobTask;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration resolved for the startup job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub interval: String,
    pub enabled: bool,
}

impl JobConfig {
    pub fn new(interval: impl Into<String>, enabled: bool) -> Self {
        Self {
            interval: interval.into(),
            enabled,
        }
    }

    /// The interval to schedule with, or `None` when the job should not run.
    pub fn effective_interval(&self) -> Option<&str> {
        if self.enabled && !self.interval.trim().is_empty() {
            Some(self.interval.trim())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: u64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// What `register` does when a job with the same name is already active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Fail with `DuplicateRegistration` and keep the existing job.
    #[default]
    Reject,
    /// Stop the existing job's ticks and install the new one.
    Replace,
}

/// What a tick does when the previous invocation has not finished.
///
/// The default is `Allow`: invocations may overlap when the task takes
/// longer than the interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    #[default]
    Allow,
    /// Drop the tick and count it as skipped.
    Skip,
    /// Run invocations back to back; late ticks fire as soon as the task is free.
    Queue,
}

/// Whether the registry boots when no job has been declared up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    /// Start only if at least one job was declared statically.
    Normal,
    /// Start unconditionally.
    #[default]
    Forced,
    /// Never start.
    Halted,
}

/// Passed to a task on every tick.
#[derive(Debug, Clone)]
pub struct TickContext {
    pub job_name: String,
    /// 1-based tick counter for this job.
    pub tick: u64,
    pub fired_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct JobSpec {
    pub name: String,
    pub interval: Duration,
    pub task: Arc<dyn JobTask>,
    pub on_conflict: ConflictPolicy,
    pub overlap: OverlapPolicy,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, interval: Duration, task: Arc<dyn JobTask>) -> Self {
        Self {
            name: name.into(),
            interval,
            task,
            on_conflict: ConflictPolicy::default(),
            overlap: OverlapPolicy::default(),
        }
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.on_conflict = policy;
        self
    }

    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap = policy;
        self
    }
}

impl fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("on_conflict", &self.on_conflict)
            .field("overlap", &self.overlap)
            .finish_non_exhaustive()
    }
}

/// Snapshot of a registered job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub name: String,
    pub interval_ms: u64,
    pub overlap: OverlapPolicy,
    pub registered_at: DateTime<Utc>,
    pub invocations: u64,
    pub successes: u64,
    pub failures: u64,
    pub skipped: u64,
}
