//! Service settings loaded from environment variables.
//!
//! Database settings come either from `DATABASE_URL` or from the individual
//! `POSTGRES_*` variables. `DATABASE_URL=memory://` selects the in-memory
//! store.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::{LocalPipelineConfig, WorkerPoolConfig};

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Settings validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// PostgreSQL connection parts, composed into a URL when `DATABASE_URL` is unset.
#[derive(Debug, Clone, PartialEq)]
pub struct PostgresSettings {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub db: String,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            db: "housing".to_string(),
        }
    }
}

impl PostgresSettings {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.db
        )
    }
}

/// Settings for the whole service.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Explicit database URL; takes precedence over `postgres`.
    pub database_url: Option<String>,
    pub postgres: PostgresSettings,

    /// Path to the JSON model artifact.
    pub model_path: Option<PathBuf>,

    pub api_host: String,
    pub api_port: u16,

    // Pipeline
    pub pipeline_workers: usize,
    pub job_timeout: Duration,
    pub max_attempts: u32,
    pub queue_capacity: usize,
    pub shutdown_timeout: Duration,
    /// How long finished runs stay pollable from memory.
    pub run_retention: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            postgres: PostgresSettings::default(),
            model_path: None,
            api_host: "0.0.0.0".to_string(),
            api_port: 8000,
            pipeline_workers: 4,
            job_timeout: Duration::from_secs(300),
            max_attempts: 1,
            queue_capacity: 1024,
            shutdown_timeout: Duration::from_secs(30),
            run_retention: Duration::from_secs(3600),
        }
    }
}

impl Settings {
    /// Loads settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: Full database URL, or `memory://`
    /// - `POSTGRES_USER`, `POSTGRES_PASSWORD`, `POSTGRES_HOST`, `POSTGRES_PORT`,
    ///   `POSTGRES_DB`: Used when `DATABASE_URL` is unset
    /// - `MODEL_PATH`: Path to the model artifact
    /// - `API_HOST` (default: 0.0.0.0), `API_PORT` (default: 8000)
    /// - `PIPELINE_WORKERS` (default: 4)
    /// - `PIPELINE_JOB_TIMEOUT_SECS` (default: 300)
    /// - `PIPELINE_MAX_ATTEMPTS` (default: 1)
    /// - `PIPELINE_QUEUE_CAPACITY` (default: 1024)
    /// - `PIPELINE_SHUTDOWN_TIMEOUT_SECS` (default: 30)
    /// - `PIPELINE_RUN_RETENTION_SECS` (default: 3600)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        // Database
        settings.database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());

        if let Some(val) = lookup("POSTGRES_USER") {
            settings.postgres.user = val;
        }
        if let Some(val) = lookup("POSTGRES_PASSWORD") {
            settings.postgres.password = val;
        }
        if let Some(val) = lookup("POSTGRES_HOST") {
            settings.postgres.host = val;
        }
        if let Some(val) = lookup("POSTGRES_PORT") {
            settings.postgres.port = parse_env_value(&val, "POSTGRES_PORT")?;
        }
        if let Some(val) = lookup("POSTGRES_DB") {
            settings.postgres.db = val;
        }

        // Model
        settings.model_path = lookup("MODEL_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        // API
        if let Some(val) = lookup("API_HOST") {
            settings.api_host = val;
        }
        if let Some(val) = lookup("API_PORT") {
            settings.api_port = parse_env_value(&val, "API_PORT")?;
        }

        // Pipeline
        if let Some(val) = lookup("PIPELINE_WORKERS") {
            settings.pipeline_workers = parse_env_value(&val, "PIPELINE_WORKERS")?;
        }
        if let Some(val) = lookup("PIPELINE_JOB_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "PIPELINE_JOB_TIMEOUT_SECS")?;
            settings.job_timeout = Duration::from_secs(secs);
        }
        if let Some(val) = lookup("PIPELINE_MAX_ATTEMPTS") {
            settings.max_attempts = parse_env_value(&val, "PIPELINE_MAX_ATTEMPTS")?;
        }
        if let Some(val) = lookup("PIPELINE_QUEUE_CAPACITY") {
            settings.queue_capacity = parse_env_value(&val, "PIPELINE_QUEUE_CAPACITY")?;
        }
        if let Some(val) = lookup("PIPELINE_SHUTDOWN_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "PIPELINE_SHUTDOWN_TIMEOUT_SECS")?;
            settings.shutdown_timeout = Duration::from_secs(secs);
        }
        if let Some(val) = lookup("PIPELINE_RUN_RETENTION_SECS") {
            let secs: u64 = parse_env_value(&val, "PIPELINE_RUN_RETENTION_SECS")?;
            settings.run_retention = Duration::from_secs(secs);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline_workers == 0 {
            return Err(ConfigError::ValidationFailed(
                "pipeline_workers must be greater than 0".to_string(),
            ));
        }

        if self.job_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "job_timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::ValidationFailed(
                "queue_capacity must be greater than 0".to_string(),
            ));
        }

        if self.api_host.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_host cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The database URL to connect to.
    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| self.postgres.url())
    }

    /// The model path, required for anything that predicts.
    pub fn require_model_path(&self) -> Result<&PathBuf, ConfigError> {
        self.model_path
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("MODEL_PATH".to_string()))
    }

    /// Socket address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn pipeline_config(&self) -> LocalPipelineConfig {
        LocalPipelineConfig {
            pool: WorkerPoolConfig::new(self.pipeline_workers)
                .with_job_timeout(self.job_timeout)
                .with_shutdown_timeout(self.shutdown_timeout)
                .with_run_retention(self.run_retention),
            queue_capacity: self.queue_capacity,
            max_attempts: self.max_attempts,
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    pub fn with_api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into();
        self
    }

    pub fn with_api_port(mut self, port: u16) -> Self {
        self.api_port = port;
        self
    }

    pub fn with_pipeline_workers(mut self, workers: usize) -> Self {
        self.pipeline_workers = workers;
        self
    }
}

/// Parse an environment variable value to a specific type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
