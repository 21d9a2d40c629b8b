use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Scheduler is not running, cannot register job '{job}'")]
    NotStarted { job: String },

    #[error("Job '{job}' is already registered")]
    DuplicateRegistration { job: String },

    #[error("Invalid interval '{value}': {reason}")]
    InvalidInterval { value: String, reason: String },

    #[error("Failed to fetch job configuration: {message}")]
    ConfigFetch { message: String },

    #[error("Job '{job}' failed: {message}")]
    TaskExecution { job: String, message: String },

    #[error("Startup sequence has already been launched")]
    AlreadyLaunched,

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SchedulerError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 有 fallback 可用
            SchedulerError::ConfigFetch { .. } | SchedulerError::Api(_) => ErrorSeverity::Low,
            SchedulerError::TaskExecution { .. } | SchedulerError::DuplicateRegistration { .. } => {
                ErrorSeverity::Medium
            }
            SchedulerError::InvalidInterval { .. }
            | SchedulerError::AlreadyLaunched
            | SchedulerError::ConfigValidationError { .. }
            | SchedulerError::InvalidConfigValueError { .. }
            | SchedulerError::MissingConfigError { .. } => ErrorSeverity::High,
            SchedulerError::NotStarted { .. }
            | SchedulerError::IoError(_)
            | SchedulerError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SchedulerError::NotStarted { .. } => {
                "Set scheduler.start_mode = \"forced\" so the registry starts without declared jobs"
            }
            SchedulerError::DuplicateRegistration { .. } => {
                "Use a unique job name or register with on_conflict = \"replace\""
            }
            SchedulerError::InvalidInterval { .. } => {
                "Use an interval such as \"250ms\", \"4s\", \"1m\", \"2h\" or \"1d\""
            }
            SchedulerError::ConfigFetch { .. } | SchedulerError::Api(_) => {
                "Check that the configuration service is reachable; the fallback interval is used meanwhile"
            }
            SchedulerError::TaskExecution { .. } => {
                "Inspect the task error; the job keeps firing on its next tick"
            }
            SchedulerError::AlreadyLaunched => "The startup sequence runs once per process",
            SchedulerError::IoError(_) => "Check file permissions and the audit store path",
            SchedulerError::SerializationError(_) => "Audit log file may be corrupted",
            SchedulerError::ConfigValidationError { .. }
            | SchedulerError::InvalidConfigValueError { .. }
            | SchedulerError::MissingConfigError { .. } => "Fix the configuration file and restart",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SchedulerError::NotStarted { job } => {
                format!("Job '{}' was not created because the scheduler never started", job)
            }
            SchedulerError::ConfigValidationError { field, .. }
            | SchedulerError::InvalidConfigValueError { field, .. }
            | SchedulerError::MissingConfigError { field } => {
                format!("Configuration problem with '{}': {}", field, self)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
