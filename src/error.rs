//! Error types for the engine.
//!
//! Only startup and configuration problems are errors. Silent audio, numeric
//! edge cases and game over are ordinary data.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to the host.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Audio capture unavailable or denied. Fatal, the session cannot start.
    #[error("no audio input: {reason}")]
    NoInput {
        /// Human-readable cause reported by the host.
        reason: String,
    },

    /// A configuration value is out of range or contradicts another.
    #[error("invalid config '{name}': {message}")]
    InvalidConfig {
        /// Option name.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// Sample rate of zero.
    #[error("invalid sample rate: {rate}")]
    InvalidSampleRate {
        /// The invalid sample rate.
        rate: u32,
    },

    /// A captured sample was NaN or infinite.
    #[error("non-finite sample at index {index}")]
    NonFiniteSample {
        /// Position of the first offending sample.
        index: usize,
    },

    /// `start` called on a session that already left `Idle`.
    #[error("session already started")]
    AlreadyStarted,

    /// Config or snapshot (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Creates an invalid config error.
    pub fn invalid_config(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a no-input error.
    pub fn no_input(reason: impl Into<String>) -> Self {
        Self::NoInput {
            reason: reason.into(),
        }
    }
}
