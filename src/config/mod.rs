//! Process configuration.
//!
//! Provides a single, process-wide configuration loaded once at startup,
//! replacing any hardcoded broker/behavior constants with operator-tunable
//! values.
//!
//! ## Loading order
//!
//! 1. `BIC_ROBOT_CONFIG` environment variable (path to a TOML file)
//! 2. `robot_worker.toml` in the current working directory
//! 3. Built-in defaults (`config::defaults`)
//!
//! Individual behavior knobs can additionally be overridden by their own
//! environment variables (`FAILURE_RATE`, `TIMEOUT_RATE`, `ROBOT_ID`, ...) —
//! env var takes precedence over the TOML file, which takes precedence over
//! the built-in default.
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! config::init(AppConfig::load());
//! let rate = config::get().behavior.failure_rate;
//! ```

pub mod defaults;

use crate::error::ConfigError;
use crate::scenario::Scenario;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

/// Global application configuration, initialized once at startup.
static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration.
///
/// Must be called exactly once before any call to `get()`.
pub fn init(config: AppConfig) {
    if APP_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global configuration.
///
/// Panics if `init()` has not been called — a missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static AppConfig {
    APP_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

pub fn is_initialized() -> bool {
    APP_CONFIG.get().is_some()
}

/// Broker connection and topology settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
    pub exchange: String,
    pub connection_timeout_secs: u64,
    pub amqp_heartbeat_secs: u16,
    pub prefetch: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: defaults::BROKER_HOST.to_string(),
            port: defaults::BROKER_PORT,
            user: defaults::BROKER_USER.to_string(),
            password: defaults::BROKER_PASSWORD.to_string(),
            vhost: defaults::BROKER_VHOST.to_string(),
            exchange: defaults::BROKER_EXCHANGE.to_string(),
            connection_timeout_secs: defaults::BROKER_CONNECTION_TIMEOUT_SECS,
            amqp_heartbeat_secs: defaults::BROKER_AMQP_HEARTBEAT_SECS,
            prefetch: defaults::BROKER_PREFETCH,
        }
    }
}

impl BrokerConfig {
    pub fn amqp_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}{}",
            self.user, self.password, self.host, self.port, self.vhost
        )
    }
}

/// Scenario-injection and simulation-timing behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub default_scenario: Scenario,
    pub failure_rate: f64,
    pub timeout_rate: f64,
    pub base_delay_multiplier: f64,
    pub min_delay_seconds: f64,
    pub image_base_url: String,
    pub heartbeat_interval_seconds: f64,
    pub cc_intermediate_interval_seconds: f64,
    pub re_intermediate_interval_seconds: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            default_scenario: Scenario::Success,
            failure_rate: defaults::FAILURE_RATE,
            timeout_rate: defaults::TIMEOUT_RATE,
            base_delay_multiplier: defaults::BASE_DELAY_MULTIPLIER,
            min_delay_seconds: defaults::MIN_DELAY_SECONDS,
            image_base_url: defaults::IMAGE_BASE_URL.to_string(),
            heartbeat_interval_seconds: defaults::HEARTBEAT_INTERVAL_SECONDS,
            cc_intermediate_interval_seconds: defaults::CC_INTERMEDIATE_INTERVAL_SECONDS,
            re_intermediate_interval_seconds: defaults::RE_INTERMEDIATE_INTERVAL_SECONDS,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub robot_id: String,
    pub broker: BrokerConfig,
    pub behavior: BehaviorConfig,
    /// Optional deterministic seed for the scenario selector and generators.
    /// `None` means seed from entropy.
    pub rng_seed: Option<u64>,
}

impl AppConfig {
    /// Load configuration following the order documented on this module.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = if let Ok(path) = std::env::var("BIC_ROBOT_CONFIG") {
            Self::from_file(Path::new(&path))?
        } else if Path::new("robot_worker.toml").exists() {
            Self::from_file(Path::new("robot_worker.toml"))?
        } else {
            let mut c = AppConfig {
                robot_id: defaults::ROBOT_ID.to_string(),
                ..Default::default()
            };
            if c.robot_id.is_empty() {
                c.robot_id = defaults::ROBOT_ID.to_string();
            }
            c
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ROBOT_ID") {
            self.robot_id = v;
        }
        if let Ok(v) = std::env::var("FAILURE_RATE").and_then(|v| v.parse().map_err(|_| std::env::VarError::NotPresent)) {
            self.behavior.failure_rate = v;
        }
        if let Ok(v) = std::env::var("TIMEOUT_RATE").and_then(|v| v.parse().map_err(|_| std::env::VarError::NotPresent)) {
            self.behavior.timeout_rate = v;
        }
        if self.robot_id.is_empty() {
            self.robot_id = defaults::ROBOT_ID.to_string();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.behavior.failure_rate) {
            return Err(ConfigError::Invalid(format!(
                "behavior.failure_rate must be in [0,1], got {}",
                self.behavior.failure_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.behavior.timeout_rate) {
            return Err(ConfigError::Invalid(format!(
                "behavior.timeout_rate must be in [0,1], got {}",
                self.behavior.timeout_rate
            )));
        }
        if self.behavior.base_delay_multiplier <= 0.0 {
            return Err(ConfigError::Invalid(
                "behavior.base_delay_multiplier must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
