//! Crate-wide error types.
//!
//! Each subsystem gets its own `thiserror` enum; `anyhow` is reserved for
//! the process boundary in `main`. `DispatchError` is the dispatch
//! pipeline's own enum — it never escapes `Dispatcher::handle` as a Rust
//! `Err`, it is always translated into a `ResultEnvelope` (via
//! `DispatchError::code`) before anything is published.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Errors raised by the AMQP wire adapters.
#[derive(Error, Debug)]
pub enum AmqpError {
    #[error("broker connection failed: {0}")]
    Connect(String),

    #[error("failed to declare topology: {0}")]
    Topology(String),

    #[error("publish to {routing_key} failed: {source}")]
    Publish {
        routing_key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("consume failed: {0}")]
    Consume(String),
}

/// The dispatch pipeline's internal error surface: a malformed envelope or
/// parameter mismatch, a `task_type` with no registered simulator, or a
/// simulator task that panicked instead of returning. `Dispatcher` matches
/// on these only to pick a result code and message — it never lets one
/// propagate as an `Err`.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),

    #[error("unknown task_type '{0}'")]
    UnknownTask(String),

    #[error("simulator task panicked: {0}")]
    SimulatorPanic(String),
}

impl DispatchError {
    /// The wire `code` this error maps to.
    pub fn code(&self) -> u32 {
        use crate::types::result::{CODE_SIMULATOR_ERROR, CODE_UNKNOWN_TASK, CODE_VALIDATION};
        match self {
            Self::Validation(_) => CODE_VALIDATION,
            Self::UnknownTask(_) => CODE_UNKNOWN_TASK,
            Self::SimulatorPanic(_) => CODE_SIMULATOR_ERROR,
        }
    }
}
