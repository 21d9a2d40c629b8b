//! Recurring job registry.
//!
//! Holds the named jobs that fire on a fixed interval, and the running flag
//! that must be set before anything can be registered.

use crate::core::interval::format_interval;
use crate::domain::model::{
    ConflictPolicy, JobInfo, JobSpec, OverlapPolicy, StartMode, TickContext,
};
use crate::domain::ports::JobTask;
use crate::utils::error::{Result, SchedulerError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug, Default)]
struct JobStats {
    invocations: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
    in_flight: AtomicU64,
}

/// Live view of a registered job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    name: String,
    interval: Duration,
    overlap: OverlapPolicy,
    registered_at: DateTime<Utc>,
    stats: Arc<JobStats>,
}

impl JobHandle {
    fn new(spec: &JobSpec) -> Self {
        Self {
            name: spec.name.clone(),
            interval: spec.interval,
            overlap: spec.overlap,
            registered_at: Utc::now(),
            stats: Arc::new(JobStats::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn overlap(&self) -> OverlapPolicy {
        self.overlap
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    /// Ticks that started an invocation.
    pub fn invocations(&self) -> u64 {
        self.stats.invocations.load(Ordering::Acquire)
    }

    pub fn successes(&self) -> u64 {
        self.stats.successes.load(Ordering::Acquire)
    }

    /// Invocations that returned an error or panicked.
    pub fn failures(&self) -> u64 {
        self.stats.failures.load(Ordering::Acquire)
    }

    /// Ticks dropped under [`OverlapPolicy::Skip`].
    pub fn skipped(&self) -> u64 {
        self.stats.skipped.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> u64 {
        self.stats.in_flight.load(Ordering::Acquire)
    }

    pub fn info(&self) -> JobInfo {
        JobInfo {
            name: self.name.clone(),
            interval_ms: u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            overlap: self.overlap,
            registered_at: self.registered_at,
            invocations: self.invocations(),
            successes: self.successes(),
            failures: self.failures(),
            skipped: self.skipped(),
        }
    }
}

struct ActiveJob {
    handle: JobHandle,
    ticker: JoinHandle<()>,
}

struct RegistryInner {
    running: watch::Sender<bool>,
    jobs: Mutex<HashMap<String, ActiveJob>>,
}

/// Shared handle to the job registry. Cloning is cheap; all clones see the
/// same jobs and running state.
#[derive(Clone)]
pub struct JobRegistry {
    inner: Arc<RegistryInner>,
}

impl JobRegistry {
    pub fn new() -> Self {
        let (running, _) = watch::channel(false);
        Self {
            inner: Arc::new(RegistryInner {
                running,
                jobs: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Mark the registry as running and wake everyone waiting in [`ready`].
    ///
    /// [`ready`]: JobRegistry::ready
    pub fn start(&self) {
        let changed = self.inner.running.send_if_modified(|running| {
            if *running {
                false
            } else {
                *running = true;
                true
            }
        });

        if changed {
            tracing::info!("Job registry started");
        }
    }

    /// Start according to `mode`. `declared_jobs` is the number of jobs known
    /// before boot; under [`StartMode::Normal`] the registry stays idle when
    /// it is zero.
    pub fn bootstrap(&self, mode: StartMode, declared_jobs: usize) -> bool {
        match mode {
            StartMode::Forced => self.start(),
            StartMode::Normal if declared_jobs > 0 => self.start(),
            StartMode::Normal => {
                tracing::warn!(
                    "No jobs declared and start mode is 'normal'; job registry will not start"
                );
            }
            StartMode::Halted => {
                tracing::warn!("Start mode is 'halted'; job registry will not start");
            }
        }
        self.is_running()
    }

    pub fn is_running(&self) -> bool {
        *self.inner.running.borrow()
    }

    /// Resolves once the registry is running.
    pub async fn ready(&self) {
        let mut rx = self.inner.running.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|running| *running).await;
    }

    pub async fn register(&self, spec: JobSpec) -> Result<JobHandle> {
        if !self.is_running() {
            return Err(SchedulerError::NotStarted { job: spec.name });
        }

        if spec.name.trim().is_empty() {
            return Err(SchedulerError::InvalidConfigValueError {
                field: "name".to_string(),
                value: spec.name,
                reason: "Job name cannot be empty".to_string(),
            });
        }

        if spec.interval.is_zero() {
            return Err(SchedulerError::InvalidInterval {
                value: format_interval(spec.interval),
                reason: "interval must be greater than zero".to_string(),
            });
        }

        // The tick loop schedules its first tick at `now + interval`.
        let Some(first_tick) = Instant::now().checked_add(spec.interval) else {
            return Err(SchedulerError::InvalidInterval {
                value: format_interval(spec.interval),
                reason: "interval is too large to schedule".to_string(),
            });
        };

        let mut jobs = self.inner.jobs.lock().await;

        if jobs.contains_key(&spec.name) {
            match spec.on_conflict {
                ConflictPolicy::Reject => {
                    tracing::warn!("Rejecting duplicate registration of job '{}'", spec.name);
                    return Err(SchedulerError::DuplicateRegistration { job: spec.name });
                }
                ConflictPolicy::Replace => {
                    tracing::info!("Replacing existing job '{}'", spec.name);
                }
            }
        }

        let handle = JobHandle::new(&spec);
        let ticker = tokio::spawn(run_ticks(
            spec.name.clone(),
            first_tick,
            spec.interval,
            spec.overlap,
            spec.task,
            Arc::clone(&handle.stats),
        ));

        tracing::info!(
            "Registered job '{}' every {} (overlap: {:?})",
            spec.name,
            format_interval(spec.interval),
            spec.overlap
        );

        let previous = jobs.insert(
            spec.name,
            ActiveJob {
                handle: handle.clone(),
                ticker,
            },
        );
        if let Some(previous) = previous {
            // Only the tick loop stops; an invocation already running is left to finish.
            previous.ticker.abort();
        }

        Ok(handle)
    }

    pub async fn job(&self, name: &str) -> Option<JobHandle> {
        let jobs = self.inner.jobs.lock().await;
        jobs.get(name).map(|active| active.handle.clone())
    }

    pub async fn jobs(&self) -> Vec<JobInfo> {
        let jobs = self.inner.jobs.lock().await;
        let mut infos: Vec<JobInfo> = jobs.values().map(|active| active.handle.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub async fn len(&self) -> usize {
        self.inner.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_ticks(
    name: String,
    first_tick: Instant,
    interval: Duration,
    overlap: OverlapPolicy,
    task: Arc<dyn JobTask>,
    stats: Arc<JobStats>,
) {
    let mut ticker = time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(match overlap {
        OverlapPolicy::Queue => MissedTickBehavior::Burst,
        OverlapPolicy::Allow | OverlapPolicy::Skip => MissedTickBehavior::Delay,
    });

    let mut tick: u64 = 0;
    loop {
        ticker.tick().await;
        tick += 1;

        if overlap == OverlapPolicy::Skip && stats.in_flight.load(Ordering::Acquire) > 0 {
            stats.skipped.fetch_add(1, Ordering::AcqRel);
            tracing::debug!("Job '{}' tick {} skipped: previous run still active", name, tick);
            continue;
        }

        let ctx = TickContext {
            job_name: name.clone(),
            tick,
            fired_at: Utc::now(),
        };

        // Incremented before dispatch so the Skip check sees runs that are
        // spawned but not yet polled.
        stats.in_flight.fetch_add(1, Ordering::AcqRel);

        let invocation = invoke(Arc::clone(&task), ctx, Arc::clone(&stats));
        match overlap {
            OverlapPolicy::Queue => invocation.await,
            OverlapPolicy::Allow | OverlapPolicy::Skip => {
                tokio::spawn(invocation);
            }
        }
    }
}

async fn invoke(task: Arc<dyn JobTask>, ctx: TickContext, stats: Arc<JobStats>) {
    stats.invocations.fetch_add(1, Ordering::AcqRel);
    let job = ctx.job_name.clone();
    let tick = ctx.tick;

    tracing::debug!("Running job '{}' tick {}", job, tick);

    // A dedicated task keeps a panicking job from taking the tick loop down.
    let outcome = tokio::spawn(async move { task.run(ctx).await }).await;

    match outcome {
        Ok(Ok(())) => {
            stats.successes.fetch_add(1, Ordering::AcqRel);
            tracing::debug!("Job '{}' tick {} completed", job, tick);
        }
        Ok(Err(e)) => {
            stats.failures.fetch_add(1, Ordering::AcqRel);
            let err = SchedulerError::TaskExecution {
                job: job.clone(),
                message: e.to_string(),
            };
            tracing::error!("{} (tick {})", err, tick);
        }
        Err(join_err) => {
            stats.failures.fetch_add(1, Ordering::AcqRel);
            tracing::error!("Job '{}' tick {} panicked: {}", job, tick, join_err);
        }
    }

    stats.in_flight.fetch_sub(1, Ordering::AcqRel);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::task_fn;

    fn noop_spec(name: &str, interval: Duration) -> JobSpec {
        JobSpec::new(name, interval, Arc::new(task_fn(|_ctx| async { Ok(()) })))
    }

    #[test]
    fn test_bootstrap_modes() {
        let forced = JobRegistry::new();
        assert!(forced.bootstrap(StartMode::Forced, 0));

        let normal = JobRegistry::new();
        assert!(!normal.bootstrap(StartMode::Normal, 0));

        let normal_with_jobs = JobRegistry::new();
        assert!(normal_with_jobs.bootstrap(StartMode::Normal, 1));

        let halted = JobRegistry::new();
        assert!(!halted.bootstrap(StartMode::Halted, 3));
    }

    #[test]
    fn test_start_is_idempotent() {
        let registry = JobRegistry::new();
        assert!(!registry.is_running());
        registry.start();
        registry.start();
        assert!(registry.is_running());
    }

    #[tokio::test]
    async fn test_register_requires_running_registry() {
        let registry = JobRegistry::new();

        let result = registry
            .register(noop_spec("audit", Duration::from_secs(4)))
            .await;

        assert!(matches!(result, Err(SchedulerError::NotStarted { ref job }) if job == "audit"));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_register_rejects_zero_interval_and_empty_name() {
        let registry = JobRegistry::new();
        registry.start();

        assert!(matches!(
            registry.register(noop_spec("audit", Duration::ZERO)).await,
            Err(SchedulerError::InvalidInterval { .. })
        ));
        assert!(registry
            .register(noop_spec(" ", Duration::from_secs(1)))
            .await
            .is_err());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_register_rejects_unschedulable_interval() {
        let registry = JobRegistry::new();
        registry.start();

        let huge = Duration::from_secs(10_000_000_000_000_000_000);
        assert!(matches!(
            registry.register(noop_spec("audit", huge)).await,
            Err(SchedulerError::InvalidInterval { .. })
        ));
        assert!(registry.is_empty().await);
        assert!(registry.job("audit").await.is_none());
    }

    #[tokio::test]
    async fn test_info_reports_interval_in_millis() {
        let registry = JobRegistry::new();
        registry.start();

        let handle = registry
            .register(noop_spec("yearly", Duration::from_secs(365 * 24 * 60 * 60)))
            .await
            .unwrap();

        assert_eq!(handle.info().interval_ms, 31_536_000_000);
    }

    #[tokio::test]
    async fn test_ready_resolves_after_start() {
        let registry = JobRegistry::new();
        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.ready().await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        registry.start();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("ready() should resolve after start")
            .unwrap();
    }

    #[tokio::test]
    async fn test_jobs_snapshot_is_sorted() {
        let registry = JobRegistry::new();
        registry.start();
        registry
            .register(noop_spec("b-job", Duration::from_secs(10)))
            .await
            .unwrap();
        registry
            .register(noop_spec("a-job", Duration::from_secs(5)))
            .await
            .unwrap();

        let infos = registry.jobs().await;
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a-job", "b-job"]);
        assert_eq!(infos[0].interval_ms, 5_000);
        assert!(registry.job("a-job").await.is_some());
        assert!(registry.job("missing").await.is_none());
    }
}
