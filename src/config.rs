// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub process_name: String,
    pub offsets_path: PathBuf,
    /// Poll loop frequency in Hz.
    pub tick_rate: u32,
    /// Failed attaches before the status reports failure.
    pub attach_attempts: u32,
    /// How long a remote call may run before its region is abandoned.
    pub thread_timeout_ms: u64,
    /// Roots under the DataModel the watcher keeps in sync.
    pub services: Vec<String>,
    /// How long the host waits for client replies to one request.
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process_name: "RobloxPlayerBeta.exe".to_string(),
            offsets_path: PathBuf::from("offsets.json"),
            tick_rate: 60,
            attach_attempts: 10,
            thread_timeout_ms: 5000,
            services: vec!["Workspace".to_string(), "Players".to_string()],
            request_timeout_ms: 10_000,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = name.into();
        self
    }

    pub fn with_offsets_path(mut self, path: PathBuf) -> Self {
        self.offsets_path = path;
        self
    }

    pub fn with_tick_rate(mut self, tick_rate: u32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.process_name.trim().is_empty() {
            return Err(ConfigError::Invalid("process_name must not be empty".to_string()));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be greater than 0".to_string()));
        }
        if self.attach_attempts == 0 {
            return Err(ConfigError::Invalid("attach_attempts must be greater than 0".to_string()));
        }
        if self.thread_timeout_ms == 0 {
            return Err(ConfigError::Invalid("thread_timeout_ms must be greater than 0".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn thread_timeout(&self) -> Duration {
        Duration::from_millis(self.thread_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
