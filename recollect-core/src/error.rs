//! Error types for the history tracker.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while building or querying a history tracker.
#[derive(Error, Debug)]
pub enum Error {
    /// A caller-supplied argument was rejected (e.g. an empty key part)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The tracker was created outside of a Tokio runtime
    #[error("No Tokio runtime available to run the background cleaner")]
    NoRuntime,

    /// A remote call did not complete within the configured timeout
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    /// The ordered-set service reported a failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Redis command error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl Error {
    /// Returns `true` if this error means the backend could not be reached or did not answer.
    ///
    /// Best-effort tracker operations downgrade these to "no effect".
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::Backend(_) => true,
            #[cfg(feature = "redis")]
            Error::Redis(_) => true,
            Error::InvalidArgument(_) | Error::NoRuntime => false,
        }
    }
}
