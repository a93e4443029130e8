//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `mailflow.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::time::Duration;

use serde::Deserialize;

use mailflow_app::automation_engine::EngineConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// In-process delay sweeper.
    pub scheduler: SchedulerConfig,
    pub engine: EngineSettings,
    pub events: EventsConfig,
    pub mailer: MailerConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Disable to rely solely on the worker endpoint.
    pub enabled: bool,
    pub interval_secs: u64,
    /// Tickets claimed per tick.
    pub batch_size: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub delivery_timeout_secs: u64,
    pub max_chain_depth: u32,
    /// Fail runs on undecodable steps instead of skipping them.
    pub strict_steps: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast buffer per listener before it starts lagging.
    pub capacity: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MailerConfig {
    /// Addresses the virtual mailer refuses.
    pub bounce: Vec<String>,
}

impl Config {
    /// Load configuration from `mailflow.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting values are out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("mailflow.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("MAILFLOW_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("MAILFLOW_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("MAILFLOW_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("MAILFLOW_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("MAILFLOW_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(secs) = var("MAILFLOW_SWEEP_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.scheduler.interval_secs = secs;
        }
        if let Some(size) = var("MAILFLOW_SWEEP_BATCH_SIZE").and_then(|v| v.parse().ok()) {
            self.scheduler.batch_size = size;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scheduler.interval_secs must be at least 1".to_string(),
            ));
        }
        if self.scheduler.batch_size == 0 {
            return Err(ConfigError::Validation(
                "scheduler.batch_size must be at least 1".to_string(),
            ));
        }
        if self.engine.delivery_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "engine.delivery_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::Validation(
                "events.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.interval_secs)
    }

    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            delivery_timeout: Duration::from_secs(self.engine.delivery_timeout_secs),
            max_chain_depth: self.engine.max_chain_depth,
            strict_steps: self.engine.strict_steps,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:mailflow.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "mailflowd=info,mailflow=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            batch_size: 100,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            delivery_timeout_secs: defaults.delivery_timeout.as_secs(),
            max_chain_depth: defaults.max_chain_depth,
            strict_steps: defaults.strict_steps,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}
