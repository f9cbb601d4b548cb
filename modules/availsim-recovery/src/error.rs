//! Error types for the recovery-detection module

use thiserror::Error;

pub type RecoveryResult<T> = Result<T, RecoveryError>;

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("probe request to {url} failed: {source}")]
    ProbeFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("recovery of {component} was not observed within {timeout_secs}s")]
    TimedOut { component: String, timeout_secs: u64 },
}
