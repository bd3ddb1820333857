//! Engine configuration loading
//!
//! The engine is wired once per wizard session. Hosts either build an
//! `EngineConfig` in code (`EngineConfig::default()` matches the reference
//! 7-step wizard) or load it from a TOML file:
//!
//! ```toml
//! step_count = 7
//! partial_error_threshold = 2
//! event_capacity = 256
//!
//! [sync]
//! method_step = 4
//! requisites_step = 5
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every field is optional; missing fields fall back to built-in defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Engine configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Number of wizard steps (step ids are 1..=step_count)
    #[serde(default = "default_step_count")]
    pub step_count: u8,

    /// Highest error count that still reports `partial` rather than `error`
    #[serde(default = "default_partial_error_threshold")]
    pub partial_error_threshold: usize,

    /// EventBus channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Payment method / requisites coupling
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identities of the coupled payment method and requisites steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Wizards without a payment pair set this to false
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_method_step")]
    pub method_step: u8,

    #[serde(default = "default_requisites_step")]
    pub requisites_step: u8,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            method_step: default_method_step(),
            requisites_step: default_requisites_step(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber at `level`
    ///
    /// Appends to `file` when set, otherwise writes to stderr. Fails if the
    /// level does not parse or a subscriber is already installed.
    pub fn init_tracing(&self) -> Result<()> {
        let filter = EnvFilter::try_new(&self.level)
            .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", self.level, e)))?;
        let registry = tracing_subscriber::registry().with(filter);

        let installed = match &self.file {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                registry
                    .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                    .try_init()
            }
            None => registry
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init(),
        };
        installed.map_err(|e| Error::Config(format!("Tracing already initialized: {}", e)))?;

        debug!("Tracing initialized at level {}", self.level);
        Ok(())
    }
}

fn default_step_count() -> u8 {
    7
}

fn default_partial_error_threshold() -> usize {
    2
}

fn default_event_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

fn default_method_step() -> u8 {
    4
}

fn default_requisites_step() -> u8 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_count: default_step_count(),
            partial_error_threshold: default_partial_error_threshold(),
            event_capacity: default_event_capacity(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(
            "Engine config loaded from {}: {} steps, coupling={:?}",
            path.display(),
            config.step_count,
            config.coupling()
        );
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        debug!("Engine config parsed: {:?}", config);
        Ok(config)
    }

    /// Coupled (method step, requisites step), if coupling is enabled
    pub fn coupling(&self) -> Option<(u8, u8)> {
        self.sync
            .enabled
            .then_some((self.sync.method_step, self.sync.requisites_step))
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.step_count == 0 {
            return Err(Error::Config("step_count must be at least 1".to_string()));
        }

        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }

        if let Some((method_step, requisites_step)) = self.coupling() {
            for (label, step) in [
                ("method_step", method_step),
                ("requisites_step", requisites_step),
            ] {
                if step == 0 || step > self.step_count {
                    return Err(Error::Config(format!(
                        "sync.{} = {} is outside 1..={}",
                        label, step, self.step_count
                    )));
                }
            }
            if method_step == requisites_step {
                return Err(Error::Config(
                    "sync.method_step and sync.requisites_step must differ".to_string(),
                ));
            }
        }

        Ok(())
    }
}
