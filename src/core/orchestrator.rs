//! One-shot startup sequence that resolves the job configuration and
//! registers the recurring job.
//!
//! ```text
//! Idle -> Deferred -> ConfigResolved -> JobRegistered
//! Idle -> Deferred -> ConfigFailed   -> JobRegistered (fallback)
//! Idle -> Deferred -> Disabled
//! Idle -> Deferred -> ... -> Aborted   (registry not running)
//! ```

use crate::core::interval::{format_interval, parse_interval};
use crate::core::registry::{JobHandle, JobRegistry};
use crate::domain::model::{ConflictPolicy, JobSpec, OverlapPolicy};
use crate::domain::ports::{ConfigSource, JobTask};
use crate::utils::error::{Result, SchedulerError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

pub const DEFAULT_JOB_NAME: &str = "audit-startup-job";
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_FALLBACK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct StartupSettings {
    pub job_name: String,
    /// Upper bound on how long to wait for the registry to become ready.
    pub startup_delay: Duration,
    pub fallback_interval: Duration,
    pub overlap: OverlapPolicy,
    pub on_conflict: ConflictPolicy,
}

impl Default for StartupSettings {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            startup_delay: DEFAULT_STARTUP_DELAY,
            fallback_interval: DEFAULT_FALLBACK_INTERVAL,
            overlap: OverlapPolicy::default(),
            on_conflict: ConflictPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    Idle,
    Deferred,
    ConfigResolved,
    ConfigFailed,
    JobRegistered { fallback: bool },
    Disabled,
    Aborted,
}

impl StartupState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StartupState::JobRegistered { .. } | StartupState::Disabled | StartupState::Aborted
        )
    }
}

#[derive(Debug)]
pub enum StartupOutcome {
    Registered { handle: JobHandle, fallback: bool },
    Disabled,
    Aborted(SchedulerError),
}

pub struct StartupOrchestrator {
    registry: JobRegistry,
    source: Arc<dyn ConfigSource>,
    task: Arc<dyn JobTask>,
    settings: StartupSettings,
    state: watch::Sender<StartupState>,
    launched: AtomicBool,
}

impl StartupOrchestrator {
    pub fn new(
        registry: JobRegistry,
        source: Arc<dyn ConfigSource>,
        task: Arc<dyn JobTask>,
        settings: StartupSettings,
    ) -> Self {
        let (state, _) = watch::channel(StartupState::Idle);
        Self {
            registry,
            source,
            task,
            settings,
            state,
            launched: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &StartupSettings {
        &self.settings
    }

    pub fn state(&self) -> StartupState {
        *self.state.borrow()
    }

    /// Wait until the sequence reaches a terminal state.
    pub async fn wait_settled(&self) -> StartupState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(StartupState::is_terminal).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        settled
    }

    /// Spawn the deferred startup action on the current runtime.
    pub fn launch(self: &Arc<Self>) -> Result<JoinHandle<StartupOutcome>> {
        self.claim()?;
        tracing::info!("Startup: configuring scheduled jobs in the background");

        let this = Arc::clone(self);
        Ok(tokio::spawn(async move { this.sequence().await }))
    }

    /// Run the startup sequence inline.
    pub async fn run(&self) -> Result<StartupOutcome> {
        self.claim()?;
        Ok(self.sequence().await)
    }

    fn claim(&self) -> Result<()> {
        self.launched
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| SchedulerError::AlreadyLaunched)
    }

    fn set_state(&self, state: StartupState) {
        self.state.send_replace(state);
    }

    async fn sequence(&self) -> StartupOutcome {
        self.set_state(StartupState::Deferred);

        if time::timeout(self.settings.startup_delay, self.registry.ready())
            .await
            .is_err()
        {
            tracing::warn!(
                "Job registry not ready after {:?}, continuing with job configuration",
                self.settings.startup_delay
            );
        }

        tracing::info!("Fetching configuration for job '{}'", self.settings.job_name);

        let fallback = self.settings.fallback_interval;
        let (interval, used_fallback) = match self.source.fetch_config().await {
            Ok(config) => match config.effective_interval() {
                Some(raw) => match parse_interval(raw) {
                    Ok(interval) => {
                        self.set_state(StartupState::ConfigResolved);
                        tracing::info!(
                            "Configuration fetched: interval={}, enabled={}. Creating job",
                            raw,
                            config.enabled
                        );
                        (interval, false)
                    }
                    Err(e) => {
                        self.set_state(StartupState::ConfigFailed);
                        tracing::error!(
                            "{}. Using fallback interval={}",
                            e,
                            format_interval(fallback)
                        );
                        (fallback, true)
                    }
                },
                None => {
                    tracing::warn!(
                        "Job '{}' is disabled in configuration and will not be scheduled",
                        self.settings.job_name
                    );
                    self.set_state(StartupState::Disabled);
                    return StartupOutcome::Disabled;
                }
            },
            Err(e) => {
                self.set_state(StartupState::ConfigFailed);
                let err = SchedulerError::ConfigFetch {
                    message: e.to_string(),
                };
                tracing::error!("{}. Using fallback interval={}", err, format_interval(fallback));
                (fallback, true)
            }
        };

        self.create_job(interval, used_fallback).await
    }

    async fn create_job(&self, interval: Duration, fallback: bool) -> StartupOutcome {
        let job_name = self.settings.job_name.clone();

        // Checked once; there is no retry if the registry never came up.
        if !self.registry.is_running() {
            let err = SchedulerError::NotStarted { job: job_name };
            tracing::error!("{}. {}", err, err.recovery_suggestion());
            self.set_state(StartupState::Aborted);
            return StartupOutcome::Aborted(err);
        }

        tracing::info!("Scheduling job '{}' every {}", job_name, format_interval(interval));

        let spec = JobSpec::new(job_name.clone(), interval, Arc::clone(&self.task))
            .with_conflict_policy(self.settings.on_conflict)
            .with_overlap_policy(self.settings.overlap);

        match self.registry.register(spec).await {
            Ok(handle) => {
                self.set_state(StartupState::JobRegistered { fallback });
                tracing::info!(
                    "Job '{}' scheduled with interval {}",
                    job_name,
                    format_interval(interval)
                );
                StartupOutcome::Registered { handle, fallback }
            }
            Err(e) => {
                tracing::error!("Could not register job '{}': {}", job_name, e);
                self.set_state(StartupState::Aborted);
                StartupOutcome::Aborted(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::JobConfig;
    use crate::domain::ports::task_fn;
    use async_trait::async_trait;

    struct FixedSource(Result<JobConfig>);

    #[async_trait]
    impl ConfigSource for FixedSource {
        async fn fetch_config(&self) -> Result<JobConfig> {
            match &self.0 {
                Ok(config) => Ok(config.clone()),
                Err(e) => Err(SchedulerError::ConfigFetch {
                    message: e.to_string(),
                }),
            }
        }
    }

    fn orchestrator(registry: JobRegistry, source: Result<JobConfig>) -> Arc<StartupOrchestrator> {
        Arc::new(StartupOrchestrator::new(
            registry,
            Arc::new(FixedSource(source)),
            Arc::new(task_fn(|_ctx| async { Ok(()) })),
            StartupSettings::default(),
        ))
    }

    #[tokio::test]
    async fn test_launch_runs_at_most_once() {
        let registry = JobRegistry::new();
        registry.start();
        let orch = orchestrator(registry, Ok(JobConfig::new("4s", true)));

        let handle = orch.launch().unwrap();
        assert!(matches!(orch.launch(), Err(SchedulerError::AlreadyLaunched)));
        assert!(matches!(orch.run().await, Err(SchedulerError::AlreadyLaunched)));

        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, StartupOutcome::Registered { fallback: false, .. }));
    }

    #[tokio::test]
    async fn test_registers_with_configured_interval() {
        let registry = JobRegistry::new();
        registry.start();
        let orch = orchestrator(registry.clone(), Ok(JobConfig::new("4s", true)));

        match orch.run().await.unwrap() {
            StartupOutcome::Registered { handle, fallback } => {
                assert!(!fallback);
                assert_eq!(handle.interval(), Duration::from_secs(4));
                assert_eq!(handle.name(), DEFAULT_JOB_NAME);
            }
            other => panic!("Expected registration, got {:?}", other),
        }
        assert_eq!(
            orch.state(),
            StartupState::JobRegistered { fallback: false }
        );
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_disabled_config_registers_nothing() {
        let registry = JobRegistry::new();
        registry.start();
        let orch = orchestrator(registry.clone(), Ok(JobConfig::new("4s", false)));

        assert!(matches!(orch.run().await.unwrap(), StartupOutcome::Disabled));
        assert_eq!(orch.state(), StartupState::Disabled);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_unparseable_interval_uses_fallback() {
        let registry = JobRegistry::new();
        registry.start();
        let orch = orchestrator(registry, Ok(JobConfig::new("every now and then", true)));

        match orch.run().await.unwrap() {
            StartupOutcome::Registered { handle, fallback } => {
                assert!(fallback);
                assert_eq!(handle.interval(), DEFAULT_FALLBACK_INTERVAL);
            }
            other => panic!("Expected fallback registration, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_interval_uses_fallback() {
        let registry = JobRegistry::new();
        registry.start();
        let orch = orchestrator(
            registry.clone(),
            Ok(JobConfig::new("10000000000000000000s", true)),
        );

        match orch.run().await.unwrap() {
            StartupOutcome::Registered { handle, fallback } => {
                assert!(fallback);
                assert_eq!(handle.interval(), DEFAULT_FALLBACK_INTERVAL);
            }
            other => panic!("Expected fallback registration, got {:?}", other),
        }
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborts_when_registry_never_starts() {
        let registry = JobRegistry::new();
        let orch = orchestrator(registry.clone(), Ok(JobConfig::new("4s", true)));

        let outcome = orch.run().await.unwrap();

        assert!(matches!(
            outcome,
            StartupOutcome::Aborted(SchedulerError::NotStarted { .. })
        ));
        assert_eq!(orch.state(), StartupState::Aborted);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_wait_settled_observes_terminal_state() {
        let registry = JobRegistry::new();
        registry.start();
        let orch = orchestrator(registry, Ok(JobConfig::new("4s", false)));

        let _handle = orch.launch().unwrap();
        assert_eq!(orch.wait_settled().await, StartupState::Disabled);
    }
}
