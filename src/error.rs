//! Error types

use std::any::Any;

use thiserror::Error;

/// Errors surfaced synchronously to the caller.
///
/// Delivery failures are not part of this enum: they are recovered inside
/// the engine and only ever reach the configured [`Logger`](crate::Logger).
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Missing sink or an unusable numeric setting
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Level label that is not one of trace | debug | info | off
    #[error("invalid level '{0}', must be one of: trace | debug | info | off")]
    InvalidLevel(String),

    /// Settings document that failed to deserialize
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Error a sink reports for a batch it could not deliver.
pub type SinkError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A panic caught at an instrumentation or delivery boundary.
#[derive(Debug, Clone, Error)]
#[error("panicked: {message}")]
pub struct Panicked {
    pub message: String,
}

impl Panicked {
    pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_owned()
        };
        Self { message }
    }
}

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
