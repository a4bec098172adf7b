//! Backend trait and configuration.
//!
//! The [`Backend`] trait defines the lifecycle for running circuits:
//!
//! ```text
//!   capabilities() ──→ validate() ──→ submit() ──→ status() ──→ result()
//!    (sync, &ref)       (async)       (async)      (async)      (async)
//! ```
//!
//! ## Method table
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `capabilities()` | sync | yes | `&Capabilities` |
//! | `availability()` | async | yes | `HalResult<BackendAvailability>` |
//! | `validate()` | async | yes | `HalResult<ValidationResult>` |
//! | `submit()` | async | yes | `HalResult<JobId>` |
//! | `status()` | async | yes | `HalResult<JobStatus>` |
//! | `result()` | async | yes | `HalResult<JobResult>` |
//! | `cancel()` | async | yes | `HalResult<()>` |
//! | `run()` | async | provided | `HalResult<JobId>` |
//! | `wait()` | async | provided | `HalResult<JobResult>` |

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use qdd_ir::Circuit;

use crate::capability::Capabilities;
use crate::error::{HalError, HalResult};
use crate::job::{JobId, JobStatus};
use crate::request::ExecutionRequest;
use crate::result::JobResult;

/// Poll interval used by the provided [`Backend::wait`].
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration for a backend instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name of the backend.
    pub name: String,
    /// Additional configuration.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Create a new backend configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Add extra configuration.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Trait for circuit-executing backends.
///
/// # Contract
///
/// - `capabilities()` is synchronous and infallible; capabilities are
///   cached at construction time.
/// - `submit()` validates every request of the batch and rejects the whole
///   batch on the first problem, before any execution resource is
///   allocated. An accepted batch starts in `Queued`.
/// - Results come back in submission order.
/// - `result()` is only valid when status is `Completed`.
/// - `cancel()` succeeds only for `Queued` jobs.
/// - `wait()` has no timeout; timeout policy belongs to the caller.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the capabilities of this backend.
    fn capabilities(&self) -> &Capabilities;

    /// Check backend availability.
    async fn availability(&self) -> HalResult<BackendAvailability>;

    /// Validate a circuit against backend constraints without running it.
    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult>;

    /// Submit a batch of requests as one job.
    async fn submit(&self, requests: Vec<ExecutionRequest>) -> HalResult<JobId>;

    /// Get the status of a job.
    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus>;

    /// Get the results of a completed job.
    async fn result(&self, job_id: &JobId) -> HalResult<JobResult>;

    /// Cancel a queued job.
    async fn cancel(&self, job_id: &JobId) -> HalResult<()>;

    /// Submit a single request.
    async fn run(&self, request: ExecutionRequest) -> HalResult<JobId> {
        self.submit(vec![request]).await
    }

    /// Wait for a job to finish and return its results.
    ///
    /// Default implementation polls [`status`](Backend::status).
    async fn wait(&self, job_id: &JobId) -> HalResult<JobResult> {
        loop {
            match self.status(job_id).await? {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(msg) => return Err(HalError::JobFailed(msg)),
                JobStatus::Cancelled => return Err(HalError::JobCancelled),
                JobStatus::Queued | JobStatus::Running => {
                    tokio::time::sleep(WAIT_POLL_INTERVAL).await;
                }
            }
        }
    }
}

/// Backend availability information.
#[derive(Debug, Clone)]
pub struct BackendAvailability {
    /// Whether the backend is currently accepting jobs.
    pub is_available: bool,
    /// Number of jobs waiting for a worker (if known).
    pub queue_depth: Option<u32>,
    /// Human-readable status message.
    pub status_message: Option<String>,
}

impl BackendAvailability {
    /// Available with the given queue depth.
    pub fn available(queue_depth: u32) -> Self {
        Self {
            is_available: true,
            queue_depth: Some(queue_depth),
            status_message: None,
        }
    }

    /// Create availability for an offline backend.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_available: false,
            queue_depth: None,
            status_message: Some(reason.into()),
        }
    }
}

/// Result of circuit validation against backend constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Circuit can be submitted as-is.
    Valid,
    /// Circuit cannot run on this backend.
    Invalid {
        /// Reasons the circuit is invalid.
        reasons: Vec<String>,
    },
}

impl ValidationResult {
    /// `Valid` if there are no reasons, `Invalid` otherwise.
    pub fn from_reasons(reasons: Vec<String>) -> Self {
        if reasons.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid { reasons }
        }
    }

    /// Check if the circuit is valid.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Convert to a result, joining the reasons into an `InvalidCircuit`.
    pub fn into_result(self) -> HalResult<()> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid { reasons } => {
                Err(HalError::InvalidCircuit(reasons.join("; ")))
            }
        }
    }
}

/// Trait for creating backends from configuration.
pub trait BackendFactory: Backend + Sized {
    /// Create a backend from configuration.
    fn from_config(config: BackendConfig) -> HalResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_config() {
        let config = BackendConfig::new("test").with_extra("max_qubits", serde_json::json!(10));

        assert_eq!(config.name, "test");
        assert_eq!(config.extra["max_qubits"], 10);
    }

    #[test]
    fn test_backend_config_flattened_json() {
        let config: BackendConfig =
            serde_json::from_str(r#"{"name": "sim", "max_shots": 100}"#).unwrap();
        assert_eq!(config.name, "sim");
        assert!(config.extra.contains_key("max_shots"));
    }

    #[test]
    fn test_backend_availability() {
        let avail = BackendAvailability::available(2);
        assert!(avail.is_available);
        assert_eq!(avail.queue_depth, Some(2));

        let avail = BackendAvailability::unavailable("shutting down");
        assert!(!avail.is_available);
        assert_eq!(avail.status_message, Some("shutting down".to_string()));
    }

    #[test]
    fn test_validation_result() {
        assert!(ValidationResult::Valid.is_valid());
        assert!(ValidationResult::Valid.into_result().is_ok());
        let invalid = ValidationResult::Invalid {
            reasons: vec!["too wide".into(), "bad gate".into()],
        };
        assert!(!invalid.is_valid());
        assert_eq!(ValidationResult::from_reasons(vec![]), ValidationResult::Valid);
        match invalid.into_result() {
            Err(HalError::InvalidCircuit(msg)) => assert_eq!(msg, "too wide; bad gate"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
