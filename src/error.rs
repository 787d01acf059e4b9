//! Error types for the wayfinding core

use thiserror::Error;

/// Errors raised while configuring or driving wayfinding components.
///
/// Recoverable runtime conditions (no marker in frame, unknown marker,
/// malformed path, unknown cue) are not errors; they are reported through
/// outcomes, logs and the notification sink.
#[derive(Debug, Error)]
pub enum WayfindingError {
    /// Config file could not be read
    #[error("failed to read config: {0}")]
    ConfigIo(String),

    /// Config file could not be parsed
    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    /// A parameter is out of range
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Two anchors were registered under the same id
    #[error("duplicate anchor id `{0}`")]
    DuplicateAnchor(String),

    /// Lifecycle transition requested from the wrong state
    #[error("{component}: cannot {transition} while {state}")]
    Lifecycle {
        component: String,
        transition: &'static str,
        state: String,
    },
}

impl WayfindingError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        WayfindingError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WayfindingError>;
