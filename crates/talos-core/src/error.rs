use thiserror::Error;

use crate::job::JobState;

/// Client-wide error types for Talos.
///
/// The first three variants describe failures of *our* request
/// (transport, API rejection, decoding); [`Error::Job`] means the request
/// succeeded but the remote job itself failed. Callers that need to branch
/// on that distinction use [`Error::is_job_failure`].
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure or 5xx that persisted through every retry attempt.
    #[error("{action}: transport failed after {attempts} attempt(s): {message}")]
    Transport {
        action: String,
        attempts: u32,
        message: String,
    },

    /// The API rejected the request (4xx) with a server-supplied message.
    #[error("{action}: API error (HTTP {status}): {message}")]
    Api {
        action: String,
        status: u16,
        message: String,
    },

    /// Response body was not valid JSON or did not match the expected shape.
    #[error("{action}: failed to decode response: {source}")]
    Decode {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    /// The remote job reached `failed` or `cancelled`.
    #[error("job {state}: {message}")]
    Job { state: JobState, message: String },

    /// Request rejected client-side, before any network call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Convenience alias used throughout the client.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn transport(
        action: impl Into<String>,
        attempts: u32,
        message: impl Into<String>,
    ) -> Self {
        Error::Transport {
            action: action.into(),
            attempts,
            message: message.into(),
        }
    }

    pub fn api(action: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Error::Api {
            action: action.into(),
            status,
            message: message.into(),
        }
    }

    pub fn decode(action: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Decode {
            action: action.into(),
            source,
        }
    }

    pub fn job(state: JobState, message: impl Into<String>) -> Self {
        Error::Job {
            state,
            message: message.into(),
        }
    }

    /// True when the remote job legitimately failed, as opposed to our
    /// request failing.
    pub fn is_job_failure(&self) -> bool {
        matches!(self, Error::Job { .. })
    }
}
