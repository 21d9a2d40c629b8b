use crate::core::{ConfigSource, JobConfig};
use crate::utils::error::{Result, SchedulerError};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;

/// Stands in for a remote parameter service: every call yields a random
/// interval between `min_secs` and `max_secs` seconds, always enabled.
#[derive(Debug, Clone)]
pub struct MockParameterSource {
    min_secs: u64,
    max_secs: u64,
}

impl MockParameterSource {
    pub fn new() -> Self {
        Self {
            min_secs: 10,
            max_secs: 30,
        }
    }

    pub fn with_range(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs: min_secs.min(max_secs),
            max_secs: max_secs.max(min_secs),
        }
    }

    fn pick_seconds(&self) -> u64 {
        rand::rng().random_range(self.min_secs..=self.max_secs)
    }
}

impl Default for MockParameterSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigSource for MockParameterSource {
    async fn fetch_config(&self) -> Result<JobConfig> {
        tracing::debug!("Simulating remote call for job configuration");
        let seconds = self.pick_seconds();
        Ok(JobConfig::new(format!("{}s", seconds), true))
    }
}

/// Configuration fixed at startup, typically from the TOML file.
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    config: JobConfig,
}

impl StaticConfigSource {
    pub fn new(config: JobConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch_config(&self) -> Result<JobConfig> {
        Ok(self.config.clone())
    }
}

/// Fetches `{"interval": "...", "enabled": bool}` from an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpConfigSource {
    client: Client,
    endpoint: String,
}

impl HttpConfigSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch_config(&self) -> Result<JobConfig> {
        tracing::debug!("Requesting job configuration from: {}", self.endpoint);
        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        tracing::debug!("Configuration service response status: {}", status);

        if !status.is_success() {
            return Err(SchedulerError::ConfigFetch {
                message: format!("{} returned HTTP {}", self.endpoint, status),
            });
        }

        let config: JobConfig = response.json().await?;
        Ok(config)
    }
}
