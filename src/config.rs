//! Configuration management for the fraud feed

use crate::feed::polling::PollSettings;
use crate::scoring::RiskRules;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment override for the backend location
pub const API_URL_ENV: &str = "FRAUD_API_URL";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub stream: StreamConfig,
    pub polling: PollingConfig,
    pub simulator: SimulatorConfig,
    /// Country and merchant-category risk lists
    pub scoring: RiskRules,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Backend connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend root, without the `/api/v1` prefix
    pub base_url: String,
    /// Timeout for batch requests in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

/// Event stream configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Stream endpoint path relative to the backend root
    pub path: String,
    /// Fixed delay between a failure and the next attempt
    pub reconnect_delay_ms: u64,
    /// Number of live events kept in memory
    pub buffer_capacity: usize,
    pub connect_timeout_ms: u64,
    /// Longest silence tolerated on an open stream before it is dropped
    pub read_timeout_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            path: "/api/v1/stream/transactions".to_string(),
            reconnect_delay_ms: 3000,
            buffer_capacity: 20,
            connect_timeout_ms: 5000,
            read_timeout_ms: 15_000,
        }
    }
}

/// Polling fallback configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Transactions requested per poll
    pub batch_limit: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 6000,
            batch_limit: 20,
        }
    }
}

/// What-if simulator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Artificial inference latency bounds
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub history_capacity: usize,
    /// Fixed jitter seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            min_latency_ms: 500,
            max_latency_ms: 1100,
            history_capacity: 10,
            seed: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path. A missing file yields the
    /// defaults; the backend URL may still be overridden from the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .build()
            .context("Failed to build configuration")?;

        let mut app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if let Ok(url) = std::env::var(API_URL_ENV) {
            app.apply_api_url(&url);
        }
        Ok(app)
    }

    fn apply_api_url(&mut self, url: &str) {
        let url = url.trim().trim_end_matches('/');
        if !url.is_empty() {
            self.api.base_url = url.to_string();
        }
    }

    /// Full URL of the event stream endpoint
    pub fn stream_url(&self) -> String {
        format!(
            "{}/{}",
            self.api.base_url.trim_end_matches('/'),
            self.stream.path.trim_start_matches('/')
        )
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.polling.interval_ms.max(1)),
            batch_limit: self.polling.batch_limit,
        }
    }

    pub fn simulator_latency(&self) -> Option<(Duration, Duration)> {
        let min = self.simulator.min_latency_ms;
        let max = self.simulator.max_latency_ms.max(min);
        if max == 0 {
            return None;
        }
        Some((Duration::from_millis(min), Duration::from_millis(max)))
    }
}
