use crate::adapters::{
    FileAuditStore, HttpConfigSource, InMemoryAuditStore, MockParameterSource, StaticConfigSource,
};
use crate::app::DEFAULT_JOB_SOURCE;
use crate::core::orchestrator::{StartupSettings, DEFAULT_JOB_NAME};
use crate::core::{AuditStore, ConfigSource, JobConfig};
use crate::domain::model::{ConflictPolicy, OverlapPolicy, StartMode};
use crate::utils::error::{Result, SchedulerError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

const DEFAULT_FALLBACK_INTERVAL: &str = "60s";
const DEFAULT_STARTUP_DELAY_MS: u64 = 1000;
const DEFAULT_TIMEOUT_SECONDS: u64 = 5;
const DEFAULT_AUDIT_PATH: &str = "./audit-data";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub startup: StartupConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub start_mode: StartMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartupConfig {
    pub job_name: Option<String>,
    pub startup_delay_ms: Option<u64>,
    pub fallback_interval: Option<String>,
    pub overlap: Option<OverlapPolicy>,
    pub on_conflict: Option<ConflictPolicy>,
    pub job_source: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Mock,
    Static,
    Http,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub r#type: SourceKind,
    pub endpoint: Option<String>,
    pub interval: Option<String>,
    pub enabled: Option<bool>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub store: StoreKind,
    pub path: Option<String>,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SchedulerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SchedulerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CONFIG_ENDPOINT})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("startup.job_name", &self.job_name())?;
        validation::validate_interval(
            "startup.fallback_interval",
            self.startup
                .fallback_interval
                .as_deref()
                .unwrap_or(DEFAULT_FALLBACK_INTERVAL),
        )?;
        validation::validate_range("startup.startup_delay_ms", self.startup_delay_ms(), 0, 600_000)?;

        match self.source.r#type {
            SourceKind::Mock => {}
            SourceKind::Static => {
                if self.source.enabled.unwrap_or(true) {
                    let interval = self.source.interval.as_deref().ok_or_else(|| {
                        SchedulerError::MissingConfigError {
                            field: "source.interval".to_string(),
                        }
                    })?;
                    validation::validate_interval("source.interval", interval)?;
                }
            }
            SourceKind::Http => {
                let endpoint = self.source.endpoint.as_deref().ok_or_else(|| {
                    SchedulerError::MissingConfigError {
                        field: "source.endpoint".to_string(),
                    }
                })?;
                validation::validate_url("source.endpoint", endpoint)?;
                validation::validate_range("source.timeout_seconds", self.timeout_seconds(), 1, 300)?;
            }
        }

        if self.audit.store == StoreKind::File {
            validation::validate_path("audit.path", self.audit_path())?;
        }

        Ok(())
    }

    pub fn job_name(&self) -> String {
        self.startup
            .job_name
            .clone()
            .unwrap_or_else(|| DEFAULT_JOB_NAME.to_string())
    }

    pub fn job_source(&self) -> String {
        self.startup
            .job_source
            .clone()
            .unwrap_or_else(|| DEFAULT_JOB_SOURCE.to_string())
    }

    pub fn startup_delay_ms(&self) -> u64 {
        self.startup.startup_delay_ms.unwrap_or(DEFAULT_STARTUP_DELAY_MS)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn audit_path(&self) -> &str {
        self.audit.path.as_deref().unwrap_or(DEFAULT_AUDIT_PATH)
    }

    pub fn startup_settings(&self) -> Result<StartupSettings> {
        let fallback_interval = validation::validate_interval(
            "startup.fallback_interval",
            self.startup
                .fallback_interval
                .as_deref()
                .unwrap_or(DEFAULT_FALLBACK_INTERVAL),
        )?;

        Ok(StartupSettings {
            job_name: self.job_name(),
            startup_delay: Duration::from_millis(self.startup_delay_ms()),
            fallback_interval,
            overlap: self.startup.overlap.unwrap_or_default(),
            on_conflict: self.startup.on_conflict.unwrap_or_default(),
        })
    }

    pub fn build_config_source(&self) -> Result<Arc<dyn ConfigSource>> {
        let source: Arc<dyn ConfigSource> = match self.source.r#type {
            SourceKind::Mock => Arc::new(MockParameterSource::new()),
            SourceKind::Static => Arc::new(StaticConfigSource::new(JobConfig::new(
                self.source.interval.clone().unwrap_or_default(),
                self.source.enabled.unwrap_or(true),
            ))),
            SourceKind::Http => {
                let endpoint = self.source.endpoint.clone().ok_or_else(|| {
                    SchedulerError::MissingConfigError {
                        field: "source.endpoint".to_string(),
                    }
                })?;
                Arc::new(HttpConfigSource::new(
                    endpoint,
                    Duration::from_secs(self.timeout_seconds()),
                )?)
            }
        };
        Ok(source)
    }

    pub fn build_audit_store(&self) -> Arc<dyn AuditStore> {
        match self.audit.store {
            StoreKind::Memory => Arc::new(InMemoryAuditStore::new()),
            StoreKind::File => Arc::new(FileAuditStore::new(self.audit_path())),
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config.scheduler.start_mode, StartMode::Forced);
        assert_eq!(config.source.r#type, SourceKind::Mock);
        assert_eq!(config.audit.store, StoreKind::Memory);
        assert!(config.validate().is_ok());

        let settings = config.startup_settings().unwrap();
        assert_eq!(settings.job_name, DEFAULT_JOB_NAME);
        assert_eq!(settings.startup_delay, Duration::from_millis(1000));
        assert_eq!(settings.fallback_interval, Duration::from_secs(60));
        assert_eq!(settings.overlap, OverlapPolicy::Allow);
        assert_eq!(settings.on_conflict, ConflictPolicy::Reject);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[scheduler]
start_mode = "normal"

[startup]
job_name = "pg-startup-job"
startup_delay_ms = 250
fallback_interval = "1m"
overlap = "skip"
on_conflict = "replace"
job_source = "Boot"

[source]
type = "static"
interval = "4s"
enabled = true

[audit]
store = "file"
path = "./test-audit"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.start_mode, StartMode::Normal);
        assert_eq!(config.job_source(), "Boot");
        assert_eq!(config.audit_path(), "./test-audit");

        let settings = config.startup_settings().unwrap();
        assert_eq!(settings.job_name, "pg-startup-job");
        assert_eq!(settings.startup_delay, Duration::from_millis(250));
        assert_eq!(settings.overlap, OverlapPolicy::Skip);
        assert_eq!(settings.on_conflict, ConflictPolicy::Replace);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("STARTUP_JOBS_TEST_ENDPOINT", "https://params.example.com/job");

        let toml_content = r#"
[source]
type = "http"
endpoint = "${STARTUP_JOBS_TEST_ENDPOINT}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.source.endpoint.as_deref(),
            Some("https://params.example.com/job")
        );
        assert!(config.validate().is_ok());

        std::env::remove_var("STARTUP_JOBS_TEST_ENDPOINT");
    }

    #[test]
    fn test_config_validation_failures() {
        let bad_endpoint = AppConfig::from_toml_str(
            r#"
[source]
type = "http"
endpoint = "invalid-url"
"#,
        )
        .unwrap();
        assert!(bad_endpoint.validate().is_err());

        let missing_endpoint = AppConfig::from_toml_str("[source]\ntype = \"http\"\n").unwrap();
        assert!(matches!(
            missing_endpoint.validate(),
            Err(SchedulerError::MissingConfigError { .. })
        ));

        let bad_fallback =
            AppConfig::from_toml_str("[startup]\nfallback_interval = \"0s\"\n").unwrap();
        assert!(bad_fallback.validate().is_err());

        let static_without_interval =
            AppConfig::from_toml_str("[source]\ntype = \"static\"\n").unwrap();
        assert!(static_without_interval.validate().is_err());

        let static_disabled =
            AppConfig::from_toml_str("[source]\ntype = \"static\"\nenabled = false\n").unwrap();
        assert!(static_disabled.validate().is_ok());
    }

    #[test]
    fn test_unknown_enum_value_is_a_parse_error() {
        let result = AppConfig::from_toml_str("[scheduler]\nstart_mode = \"eventually\"\n");
        assert!(matches!(
            result,
            Err(SchedulerError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[startup]\njob_name = \"file-job\"\n")
            .unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.job_name(), "file-job");
    }
}
