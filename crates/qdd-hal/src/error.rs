//! Error types for the HAL crate.

use qdd_ir::IrError;
use thiserror::Error;

use crate::job::JobStatus;

/// Errors that can occur in HAL operations.
///
/// The first four variants form the error taxonomy callers branch on.
/// The rest describe the job contract itself.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Circuit is malformed or does not fit the backend.
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Execution options are inconsistent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A numeric invariant was violated while executing.
    #[error("Execution failure: {0}")]
    ExecutionFailure(String),

    /// Submission would exceed declared resource limits.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Job has not reached a terminal state yet.
    #[error("Job {job_id} is still {status}")]
    JobPending {
        /// The job identifier.
        job_id: String,
        /// Its current status.
        status: JobStatus,
    },

    /// Job was cancelled.
    #[error("Job cancelled")]
    JobCancelled,

    /// Job execution failed.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// Job can no longer be cancelled.
    #[error("Job {job_id} cannot be cancelled in state {status}")]
    NotCancellable {
        /// The job identifier.
        job_id: String,
        /// Its current status.
        status: JobStatus,
    },

    /// Backend is not available.
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic backend error.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<IrError> for HalError {
    fn from(err: IrError) -> Self {
        HalError::InvalidCircuit(err.to_string())
    }
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
